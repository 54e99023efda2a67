use std::fmt;

/// Prefixes that mark a channel operator (or higher) in a NAMES entry
const ADMIN_MARKERS: [char; 3] = ['@', '&', '~'];
/// Other status prefixes, stripped without granting admin
const OTHER_MARKERS: [char; 2] = ['+', '%'];

/// Who is in the channel, and who among them is an operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipRoster {
    members: Vec<String>,
    admins: Vec<String>,
}

impl MembershipRoster {
    /// Build a roster from raw entries such as `["@alice", "bob"]`.
    /// Duplicate names keep their first position.
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roster = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            let mut is_admin = false;
            let mut name = entry;
            while let Some(first) = name.chars().next() {
                if ADMIN_MARKERS.contains(&first) {
                    is_admin = true;
                } else if !OTHER_MARKERS.contains(&first) {
                    break;
                }
                name = &name[first.len_utf8()..];
            }
            if name.is_empty() {
                continue;
            }
            if !contains(&roster.members, name) {
                roster.members.push(name.to_string());
            }
            if is_admin && !contains(&roster.admins, name) {
                roster.admins.push(name.to_string());
            }
        }
        roster
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn admins(&self) -> &[String] {
        &self.admins
    }

    pub fn is_member(&self, nick: &str) -> bool {
        contains(&self.members, nick)
    }

    pub fn is_admin(&self, nick: &str) -> bool {
        contains(&self.admins, nick)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl fmt::Display for MembershipRoster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} members ({} admins)", self.members.len(), self.admins.len())
    }
}

// IRC nicknames compare case-insensitively
fn contains(list: &[String], nick: &str) -> bool {
    list.iter().any(|n| n.eq_ignore_ascii_case(nick))
}

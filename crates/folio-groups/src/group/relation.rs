/// Relation of one identity to one group.
///
/// Derived on demand from the group snapshot and never stored. Every
/// authorization decision in the crate goes through [`compute_relation`].
use serde::{Deserialize, Serialize};

use crate::group::types::Group;
use crate::types::Identity;

/// Access level of an identity with respect to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Owner,
    Member,
    /// Anyone else, including applicants with a pending request.
    Guest,
}

impl Relation {
    pub fn is_owner(self) -> bool {
        self == Relation::Owner
    }

    /// Owner or member.
    pub fn is_admitted(self) -> bool {
        self != Relation::Guest
    }
}

/// `Owner` if `identity` owns the group, `Member` if it is in the member
/// list, `Guest` otherwise. Pending applicants are guests.
pub fn compute_relation(group: &Group, identity: &Identity) -> Relation {
    if *identity == group.owner_id {
        Relation::Owner
    } else if group.is_member(identity) {
        Relation::Member
    } else {
        Relation::Guest
    }
}

/// Relation of a possibly anonymous visitor. Anonymous visitors are guests.
pub fn relation_of(group: &Group, identity: Option<&Identity>) -> Relation {
    identity.map_or(Relation::Guest, |id| compute_relation(group, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::types::*;

    fn id(s: &str) -> Identity {
        Identity::parse(s).unwrap()
    }

    fn make_group() -> Group {
        Group {
            id: GroupId::from("grp-rel"),
            name: "Poetry Circle".into(),
            description: "One poem a week".into(),
            region: Region::Virtual,
            schedule: "Sundays".into(),
            capacity: 5,
            owner_id: id("olga"),
            members: vec![
                Member {
                    id: id("olga"),
                    display_name: "Olga".into(),
                    role: MemberRole::Owner,
                    joined_at: 1,
                },
                Member {
                    id: id("mina"),
                    display_name: "Mina".into(),
                    role: MemberRole::Member,
                    joined_at: 2,
                },
            ],
            pending_members: vec![PendingMember {
                id: id("paul"),
                display_name: "Paul".into(),
                applied_at: 3,
                motivation: Some("I like Rilke".into()),
            }],
            tags: vec![],
            image: None,
            created_at: 1,
        }
    }

    #[test]
    fn owner_member_guest() {
        let group = make_group();
        assert_eq!(compute_relation(&group, &id("olga")), Relation::Owner);
        assert_eq!(compute_relation(&group, &id("mina")), Relation::Member);
        assert_eq!(compute_relation(&group, &id("zoe")), Relation::Guest);
    }

    #[test]
    fn pending_applicant_is_guest() {
        let group = make_group();
        assert!(group.is_pending(&id("paul")));
        assert_eq!(compute_relation(&group, &id("paul")), Relation::Guest);
    }

    #[test]
    fn anonymous_is_guest() {
        let group = make_group();
        assert_eq!(relation_of(&group, None), Relation::Guest);
        assert_eq!(relation_of(&group, Some(&id("olga"))), Relation::Owner);
    }

    #[test]
    fn relation_helpers() {
        assert!(Relation::Owner.is_owner());
        assert!(Relation::Owner.is_admitted());
        assert!(Relation::Member.is_admitted());
        assert!(!Relation::Member.is_owner());
        assert!(!Relation::Guest.is_admitted());
    }
}

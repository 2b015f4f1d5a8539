use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use quizmate_common::error::RoomError;
use quizmate_common::member::Member;

/// Member identity and cumulative standing. The room core only reads
/// members; solo play is the one writer of score and level.
pub trait MemberDirectory: Send + Sync {
    fn register(&self, name: &str) -> Member;
    fn by_id(&self, id: Uuid) -> Option<Member>;
    fn credit_score(&self, id: Uuid, points: u64) -> Result<Member, RoomError>;
    fn top_members(&self, limit: usize) -> Vec<Member>;
}

#[derive(Default)]
pub struct InMemoryMemberDirectory {
    members: RwLock<HashMap<Uuid, Member>>,
}

impl InMemoryMemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemberDirectory for InMemoryMemberDirectory {
    fn register(&self, name: &str) -> Member {
        let member = Member::new(Uuid::new_v4(), name.to_string());
        self.members
            .write()
            .unwrap()
            .insert(member.id, member.clone());
        member
    }

    fn by_id(&self, id: Uuid) -> Option<Member> {
        self.members.read().unwrap().get(&id).cloned()
    }

    fn credit_score(&self, id: Uuid, points: u64) -> Result<Member, RoomError> {
        let mut members = self.members.write().unwrap();
        let member = members.get_mut(&id).ok_or(RoomError::MemberNotFound)?;
        member.credit(points);
        Ok(member.clone())
    }

    fn top_members(&self, limit: usize) -> Vec<Member> {
        let mut members: Vec<Member> = self.members.read().unwrap().values().cloned().collect();
        members.sort_by(|a, b| b.score.cmp(&a.score).then(b.level.cmp(&a.level)));
        members.truncate(limit);
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let directory = InMemoryMemberDirectory::new();
        let member = directory.register("Alice");
        assert_eq!(member.level, 1);
        assert_eq!(directory.by_id(member.id).unwrap().name, "Alice");
        assert!(directory.by_id(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_credit_recomputes_level() {
        let directory = InMemoryMemberDirectory::new();
        let member = directory.register("Alice");
        let updated = directory.credit_score(member.id, 230).unwrap();
        assert_eq!(updated.score, 230);
        assert_eq!(updated.level, 3);
        assert_eq!(
            directory.credit_score(Uuid::new_v4(), 10).unwrap_err(),
            RoomError::MemberNotFound
        );
    }

    #[test]
    fn test_top_members_orders_by_score() {
        let directory = InMemoryMemberDirectory::new();
        let a = directory.register("A");
        let b = directory.register("B");
        directory.register("C");
        directory.credit_score(a.id, 50).unwrap();
        directory.credit_score(b.id, 150).unwrap();

        let top = directory.top_members(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, b.id);
        assert_eq!(top[1].id, a.id);
    }
}

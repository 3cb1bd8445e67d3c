mod events;
mod groups;
mod history;
mod messages;
mod polls;
mod users;
mod watchlists;

use anyhow::Result;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "Priya", "priya@example.com", Some("hash1"), "pic1")
            .unwrap();
        db.create_user("u2", "Marco", "marco@example.com", Some("hash2"), "pic2")
            .unwrap();
        db.create_user("u3", "Lena", "lena@example.com", None, "pic3")
            .unwrap();
        db
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = db_with_users();
        let err = db.create_user("u9", "Other", "priya@example.com", None, "pic");
        assert!(err.is_err());
    }

    #[test]
    fn group_membership_lifecycle() {
        let db = db_with_users();
        db.create_group("g1", "Friday Club", "weekly movies", "u1", "deadbeef")
            .unwrap();

        // Creator is enrolled by create_group
        assert!(db.is_member("g1", "u1").unwrap());
        assert!(!db.is_member("g1", "u2").unwrap());

        db.add_member("g1", "u2").unwrap();
        // Idempotent
        db.add_member("g1", "u2").unwrap();
        assert_eq!(db.get_members("g1").unwrap().len(), 2);

        assert!(db.remove_member("g1", "u2").unwrap());
        assert!(!db.remove_member("g1", "u2").unwrap());
    }

    #[test]
    fn invite_token_lookup() {
        let db = db_with_users();
        db.create_group("g1", "Club", "d", "u1", "deadbeef").unwrap();

        let found = db.get_group_by_invite_token("deadbeef").unwrap().unwrap();
        assert_eq!(found.id, "g1");
        assert!(db.get_group_by_invite_token("feedface").unwrap().is_none());
    }

    #[test]
    fn event_creation_seeds_participants() {
        let db = db_with_users();
        db.create_group("g1", "Club", "d", "u1", "tok").unwrap();
        db.add_member("g1", "u2").unwrap();

        db.create_event(
            "e1",
            "Dune night",
            Some("g1"),
            "u1",
            "2026-09-05 20:00:00",
            Some("bring snacks"),
            None,
            &["guest@example.com".to_string()],
            &["438631".to_string()],
        )
        .unwrap();

        let participants = db.get_participants("e1").unwrap();
        assert_eq!(participants.len(), 2);
        let creator = participants.iter().find(|p| p.user_id == "u1").unwrap();
        assert_eq!(creator.status, "accepted");
        let member = participants.iter().find(|p| p.user_id == "u2").unwrap();
        assert_eq!(member.status, "pending");

        assert_eq!(db.get_invites("e1").unwrap(), vec!["guest@example.com"]);
        assert_eq!(db.get_event_movies("e1").unwrap(), vec!["438631"]);
    }

    #[test]
    fn rsvp_upsert_replaces_status() {
        let db = db_with_users();
        db.create_group("g1", "Club", "d", "u1", "tok").unwrap();
        db.create_event("e1", "Night", Some("g1"), "u1", "2026-09-05 20:00:00", None, None, &[], &[])
            .unwrap();

        db.set_rsvp("e1", "u1", "declined").unwrap();
        let participants = db.get_participants("e1").unwrap();
        assert_eq!(participants[0].status, "declined");
    }

    #[test]
    fn poll_revote_replaces_previous_choice() {
        let db = db_with_users();
        db.create_group("g1", "Club", "d", "u1", "tok").unwrap();
        db.create_event("e1", "Night", Some("g1"), "u1", "2026-09-05 20:00:00", None, None, &[], &[])
            .unwrap();
        db.insert_poll("p1", "e1", "u1", "What to watch?", r#"["Dune","Heat"]"#)
            .unwrap();

        db.upsert_vote("p1", "u1", "Dune").unwrap();
        db.upsert_vote("p1", "u2", "Dune").unwrap();
        db.upsert_vote("p1", "u1", "Heat").unwrap();

        let mut counts = db.get_vote_counts("p1").unwrap();
        counts.sort();
        assert_eq!(counts, vec![("Dune".to_string(), 1), ("Heat".to_string(), 1)]);

        // Still one row per user
        assert_eq!(db.get_votes("p1").unwrap().len(), 2);
    }

    #[test]
    fn group_delete_cascades_to_events_and_chat() {
        let db = db_with_users();
        db.create_group("g1", "Club", "d", "u1", "tok").unwrap();
        db.create_event("e1", "Night", Some("g1"), "u1", "2026-09-05 20:00:00", None, None, &[], &[])
            .unwrap();
        db.insert_message("m1", "e1", "u1", Some("hello"), None).unwrap();
        db.insert_poll("p1", "e1", "u1", "Q?", r#"["a","b"]"#).unwrap();
        db.upsert_vote("p1", "u2", "a").unwrap();
        db.insert_history("h1", "g1", "e1", "438631").unwrap();

        assert!(db.delete_group_cascade("g1").unwrap());

        assert!(db.get_event("e1").unwrap().is_none());
        assert!(db.get_messages_for_event("e1").unwrap().is_empty());
        assert!(db.get_poll("p1").unwrap().is_none());
        assert!(db.get_votes("p1").unwrap().is_empty());
        assert!(db.get_history_for_group("g1").unwrap().is_empty());
        assert!(db.get_group("g1").unwrap().is_none());
    }

    #[test]
    fn watchlist_deduplicates_movies() {
        let db = db_with_users();
        db.upsert_movie("438631", "Dune", None, Some(8.0), Some(2021), "[]", None)
            .unwrap();

        let list = db.get_or_create_watchlist("w1", "u1").unwrap();
        // Second call returns the same list instead of creating another
        let again = db.get_or_create_watchlist("w2", "u1").unwrap();
        assert_eq!(list.id, again.id);

        assert!(db.add_watchlist_movie(&list.id, "438631").unwrap());
        assert!(!db.add_watchlist_movie(&list.id, "438631").unwrap());
        assert_eq!(db.get_watchlist_movies(&list.id).unwrap().len(), 1);

        assert!(db.watchlist_contains("u1", "438631").unwrap());
        assert!(db.remove_watchlist_movie(&list.id, "438631").unwrap());
        assert!(!db.watchlist_contains("u1", "438631").unwrap());
    }

    #[test]
    fn recent_watched_dedupes_and_orders() {
        let db = db_with_users();
        db.create_group("g1", "Club", "d", "u1", "tok").unwrap();
        db.create_event("e1", "Night", Some("g1"), "u1", "2026-09-05 20:00:00", None, None, &[], &[])
            .unwrap();

        db.insert_history("h1", "g1", "e1", "100").unwrap();
        db.insert_history("h2", "g1", "e1", "200").unwrap();
        db.insert_history("h3", "g1", "e1", "100").unwrap();

        let recent = db.recent_watched_for_group("g1", 20).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.contains(&"100".to_string()));
        assert!(recent.contains(&"200".to_string()));
    }
}

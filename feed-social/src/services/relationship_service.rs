use std::collections::{HashMap, HashSet};

use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use feed_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewFriendship, NewRelationship, Profile, Relationship, RelationshipStatus};
use crate::schema::{friendships, profiles, relationships};

/// What a friend request to one receiver turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPlan {
    Send { receiver_id: Uuid },
    /// The receiver already asked us; accept their request instead of sending a second one.
    AcceptIncoming { relationship_id: Uuid },
}

/// Snapshot of the caller's side of the social graph.
#[derive(Debug, Default)]
pub struct Graph {
    pub friends: HashSet<Uuid>,
    pub sent_to: HashSet<Uuid>,
    /// sender profile id -> pending relationship id
    pub pending_from: HashMap<Uuid, Uuid>,
}

impl Graph {
    pub fn load(conn: &mut PgConnection, profile_id: Uuid) -> AppResult<Self> {
        let friends = load_friend_ids(conn, profile_id)?.into_iter().collect();

        let sent_to = relationships::table
            .filter(relationships::sender_id.eq(profile_id))
            .select(relationships::receiver_id)
            .load::<Uuid>(conn)?
            .into_iter()
            .collect();

        let pending_from = relationships::table
            .filter(relationships::receiver_id.eq(profile_id))
            .filter(relationships::status.eq(RelationshipStatus::Sent.as_str()))
            .select((relationships::sender_id, relationships::id))
            .load::<(Uuid, Uuid)>(conn)?
            .into_iter()
            .collect();

        Ok(Self { friends, sent_to, pending_from })
    }
}

/// Decides what a request from `me` to each of `receiver_ids` does, failing on the first invalid one.
pub fn plan_requests(
    me: Uuid,
    receiver_ids: &[Uuid],
    known_profiles: &HashSet<Uuid>,
    graph: &Graph,
) -> AppResult<Vec<RequestPlan>> {
    let mut seen = HashSet::new();
    let mut plans = Vec::with_capacity(receiver_ids.len());

    for &receiver_id in receiver_ids {
        if !seen.insert(receiver_id) {
            continue;
        }
        if !known_profiles.contains(&receiver_id) {
            return Err(AppError::with_details(
                ErrorCode::ProfileNotFound,
                "profile not found",
                serde_json::json!({ "profile_id": receiver_id }),
            ));
        }
        if receiver_id == me {
            return Err(AppError::new(ErrorCode::CannotBefriendSelf, "cannot send a friend request to yourself"));
        }
        if graph.friends.contains(&receiver_id) {
            return Err(AppError::with_details(
                ErrorCode::AlreadyFriends,
                "already friends",
                serde_json::json!({ "profile_id": receiver_id }),
            ));
        }
        if graph.sent_to.contains(&receiver_id) {
            return Err(AppError::with_details(
                ErrorCode::RequestAlreadySent,
                "friend request already sent",
                serde_json::json!({ "profile_id": receiver_id }),
            ));
        }

        plans.push(match graph.pending_from.get(&receiver_id) {
            Some(&relationship_id) => RequestPlan::AcceptIncoming { relationship_id },
            None => RequestPlan::Send { receiver_id },
        });
    }

    Ok(plans)
}

/// Only the receiver may accept, and only while the request is still pending.
pub fn check_acceptable(relationship: &Relationship, me: Uuid) -> AppResult<()> {
    if relationship.receiver_id != me {
        return Err(AppError::new(
            ErrorCode::NotRequestReceiver,
            "only the receiver can accept a friend request",
        ));
    }
    if !relationship.is_pending() {
        return Err(AppError::new(ErrorCode::RequestNotPending, "friend request was already accepted"));
    }
    Ok(())
}

/// Everyone except the caller, the caller's friends, and people the caller already asked.
pub fn eligible_profiles(all: Vec<Profile>, me: Uuid, graph: &Graph) -> Vec<Profile> {
    all.into_iter()
        .filter(|p| p.id != me && !graph.friends.contains(&p.id) && !graph.sent_to.contains(&p.id))
        .collect()
}

/// The profile a first-time visitor is introduced to, if any.
pub fn welcome_target(me: &Profile, admin: Option<&Profile>, graph: &Graph) -> Option<Uuid> {
    let admin = admin?;
    if admin.id == me.id
        || !graph.sent_to.is_empty()
        || graph.friends.contains(&admin.id)
        || graph.pending_from.contains_key(&admin.id)
    {
        return None;
    }
    Some(admin.id)
}

pub fn load_friend_ids(conn: &mut PgConnection, profile_id: Uuid) -> AppResult<Vec<Uuid>> {
    let ids = friendships::table
        .filter(friendships::profile_id.eq(profile_id))
        .order(friendships::created_at.desc())
        .select(friendships::friend_id)
        .load::<Uuid>(conn)?;
    Ok(ids)
}

pub fn insert_request(conn: &mut PgConnection, sender_id: Uuid, receiver_id: Uuid) -> AppResult<Relationship> {
    let relationship = diesel::insert_into(relationships::table)
        .values(&NewRelationship {
            sender_id,
            receiver_id,
            status: RelationshipStatus::Sent.as_str().to_string(),
        })
        .get_result::<Relationship>(conn)
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _) => {
                AppError::new(ErrorCode::RequestAlreadySent, "friend request already sent")
            }
            other => AppError::from(other),
        })?;
    Ok(relationship)
}

/// Marks the relationship accepted and records the friendship in both directions.
/// The update only matches a pending request addressed to `me`, so a concurrent
/// accept of the same request fails instead of succeeding twice.
/// Must run inside a transaction.
pub fn accept(conn: &mut PgConnection, relationship: &Relationship, me: Uuid) -> AppResult<Relationship> {
    let result = diesel::update(
        relationships::table
            .filter(relationships::id.eq(relationship.id))
            .filter(relationships::receiver_id.eq(me))
            .filter(relationships::status.eq(RelationshipStatus::Sent.as_str())),
    )
    .set((
        relationships::status.eq(RelationshipStatus::Accepted.as_str()),
        relationships::updated_at.eq(chrono::Utc::now()),
    ))
    .get_result::<Relationship>(conn);
    let updated = claimed_or_not_pending(result)?;

    diesel::insert_into(friendships::table)
        .values(&vec![
            NewFriendship { profile_id: relationship.receiver_id, friend_id: relationship.sender_id },
            NewFriendship { profile_id: relationship.sender_id, friend_id: relationship.receiver_id },
        ])
        .on_conflict_do_nothing()
        .execute(conn)?;

    Ok(updated)
}

fn claimed_or_not_pending(result: QueryResult<Relationship>) -> AppResult<Relationship> {
    match result {
        Ok(updated) => Ok(updated),
        Err(diesel::result::Error::NotFound) => Err(AppError::new(
            ErrorCode::RequestNotPending,
            "friend request was already accepted",
        )),
        Err(e) => Err(e.into()),
    }
}

/// A pending request addressed to the caller, with the sender's profile.
#[derive(Debug, Serialize)]
pub struct ReceivedRequest {
    pub relationship: Relationship,
    pub sender: Profile,
}

pub fn load_received_requests(conn: &mut PgConnection, profile_id: Uuid) -> AppResult<Vec<ReceivedRequest>> {
    let pending = relationships::table
        .filter(relationships::receiver_id.eq(profile_id))
        .filter(relationships::status.eq(RelationshipStatus::Sent.as_str()))
        .order(relationships::created_at.desc())
        .load::<Relationship>(conn)?;

    let sender_ids: Vec<Uuid> = pending.iter().map(|r| r.sender_id).collect();
    let senders: HashMap<Uuid, Profile> = profiles::table
        .filter(profiles::id.eq_any(&sender_ids))
        .load::<Profile>(conn)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(pending
        .into_iter()
        .filter_map(|relationship| {
            let sender = senders.get(&relationship.sender_id)?.clone();
            Some(ReceivedRequest { relationship, sender })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(id: Uuid, is_admin: bool) -> Profile {
        Profile {
            id,
            credential_id: Uuid::new_v4(),
            username: format!("user-{}", &id.to_string()[..8]),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            dob: None,
            bio: String::new(),
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn relationship(sender_id: Uuid, receiver_id: Uuid, status: RelationshipStatus) -> Relationship {
        Relationship {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            status: status.as_str().to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn plain_request_is_sent() {
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        let known = HashSet::from([me, other]);
        let plans = plan_requests(me, &[other], &known, &Graph::default()).unwrap();
        assert_eq!(plans, vec![RequestPlan::Send { receiver_id: other }]);
    }

    #[test]
    fn mutual_request_accepts_the_incoming_one() {
        let (me, other, rel) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let known = HashSet::from([me, other]);
        let graph = Graph { pending_from: HashMap::from([(other, rel)]), ..Graph::default() };
        let plans = plan_requests(me, &[other], &known, &graph).unwrap();
        assert_eq!(plans, vec![RequestPlan::AcceptIncoming { relationship_id: rel }]);
    }

    #[test]
    fn request_to_self_is_forbidden() {
        let me = Uuid::new_v4();
        let err = plan_requests(me, &[me], &HashSet::from([me]), &Graph::default()).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::CannotBefriendSelf);
    }

    #[test]
    fn request_to_friend_or_repeat_is_a_conflict() {
        let (me, friend, asked) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let known = HashSet::from([me, friend, asked]);
        let graph = Graph {
            friends: HashSet::from([friend]),
            sent_to: HashSet::from([asked]),
            ..Graph::default()
        };

        let err = plan_requests(me, &[friend], &known, &graph).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::AlreadyFriends);

        let err = plan_requests(me, &[asked], &known, &graph).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::RequestAlreadySent);
    }

    #[test]
    fn unknown_receiver_fails_the_whole_batch() {
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        let known = HashSet::from([me, other]);
        let err = plan_requests(me, &[other, Uuid::new_v4()], &known, &Graph::default()).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ProfileNotFound);
    }

    #[test]
    fn duplicate_receivers_in_one_batch_are_collapsed() {
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        let known = HashSet::from([me, other]);
        let plans = plan_requests(me, &[other, other], &known, &Graph::default()).unwrap();
        assert_eq!(plans.len(), 1);
    }

    #[test]
    fn only_receiver_accepts_pending_requests() {
        let (sender, receiver) = (Uuid::new_v4(), Uuid::new_v4());
        let pending = relationship(sender, receiver, RelationshipStatus::Sent);

        assert!(check_acceptable(&pending, receiver).is_ok());
        assert_eq!(
            check_acceptable(&pending, sender).unwrap_err().error_code(),
            ErrorCode::NotRequestReceiver
        );

        let accepted = relationship(sender, receiver, RelationshipStatus::Accepted);
        assert_eq!(
            check_acceptable(&accepted, receiver).unwrap_err().error_code(),
            ErrorCode::RequestNotPending
        );
    }

    #[test]
    fn eligible_excludes_self_friends_and_asked() {
        let (me, friend, asked, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let all = vec![profile(me, false), profile(friend, false), profile(asked, false), profile(stranger, false)];
        let graph = Graph {
            friends: HashSet::from([friend]),
            sent_to: HashSet::from([asked]),
            ..Graph::default()
        };

        let ids: Vec<Uuid> = eligible_profiles(all, me, &graph).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![stranger]);
    }

    #[test]
    fn first_visit_gets_welcome_request_to_admin() {
        let me = profile(Uuid::new_v4(), false);
        let admin = profile(Uuid::new_v4(), true);
        assert_eq!(welcome_target(&me, Some(&admin), &Graph::default()), Some(admin.id));
    }

    #[test]
    fn no_welcome_request_when_not_needed() {
        let me = profile(Uuid::new_v4(), false);
        let admin = profile(Uuid::new_v4(), true);

        assert_eq!(welcome_target(&admin, Some(&admin), &Graph::default()), None);
        assert_eq!(welcome_target(&me, None, &Graph::default()), None);

        let already_asked = Graph { sent_to: HashSet::from([Uuid::new_v4()]), ..Graph::default() };
        assert_eq!(welcome_target(&me, Some(&admin), &already_asked), None);

        let befriended = Graph { friends: HashSet::from([admin.id]), ..Graph::default() };
        assert_eq!(welcome_target(&me, Some(&admin), &befriended), None);

        let invited = Graph { pending_from: HashMap::from([(admin.id, Uuid::new_v4())]), ..Graph::default() };
        assert_eq!(welcome_target(&me, Some(&admin), &invited), None);
    }

    #[test]
    fn accept_that_matched_no_pending_row_is_not_pending() {
        let err = claimed_or_not_pending(Err(diesel::result::Error::NotFound)).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::RequestNotPending);

        let (sender, receiver) = (Uuid::new_v4(), Uuid::new_v4());
        let accepted = relationship(sender, receiver, RelationshipStatus::Accepted);
        let id = accepted.id;
        assert_eq!(claimed_or_not_pending(Ok(accepted)).unwrap().id, id);
    }
}

use std::collections::{HashMap, HashSet};

use diesel::dsl::count;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use feed_shared::errors::AppResult;
use feed_shared::types::{Paginated, PaginationParams};

use crate::models::Post;
use crate::schema::{comments, likes, posts, profiles};

/// A post as shown in a feed.
#[derive(Debug, Serialize)]
pub struct FeedEntry {
    pub post: Post,
    pub author_username: String,
    pub comment_count: i64,
    pub like_count: i64,
    pub liked_by_me: bool,
}

/// Per-post aggregates fetched alongside a page of posts.
#[derive(Debug, Default)]
pub struct FeedCounts {
    pub comments: HashMap<Uuid, i64>,
    pub likes: HashMap<Uuid, i64>,
    pub authors: HashMap<Uuid, String>,
    pub liked_by_me: HashSet<Uuid>,
}

/// Zips posts with their counts, keeping the order of `posts`. Missing counts are zero.
pub fn assemble(posts: Vec<Post>, counts: &FeedCounts) -> Vec<FeedEntry> {
    posts
        .into_iter()
        .map(|post| FeedEntry {
            author_username: counts.authors.get(&post.author_id).cloned().unwrap_or_default(),
            comment_count: counts.comments.get(&post.id).copied().unwrap_or(0),
            like_count: counts.likes.get(&post.id).copied().unwrap_or(0),
            liked_by_me: counts.liked_by_me.contains(&post.id),
            post,
        })
        .collect()
}

/// Posts authored by any of `author_ids`, newest first, with comment and like counts.
pub fn load_feed(
    conn: &mut PgConnection,
    viewer_id: Uuid,
    author_ids: &[Uuid],
    params: &PaginationParams,
) -> AppResult<Paginated<FeedEntry>> {
    if author_ids.is_empty() {
        return Ok(Paginated::new(Vec::new(), 0, params));
    }

    let total: i64 = posts::table
        .filter(posts::author_id.eq_any(author_ids))
        .count()
        .get_result(conn)?;

    let page = posts::table
        .filter(posts::author_id.eq_any(author_ids))
        .order((posts::date_posted.desc(), posts::id.desc()))
        .limit(params.limit() as i64)
        .offset(params.offset() as i64)
        .load::<Post>(conn)?;

    let counts = load_counts(conn, viewer_id, &page)?;
    Ok(Paginated::new(assemble(page, &counts), total.max(0) as u64, params))
}

fn load_counts(conn: &mut PgConnection, viewer_id: Uuid, page: &[Post]) -> AppResult<FeedCounts> {
    let post_ids: Vec<Uuid> = page.iter().map(|p| p.id).collect();
    let author_ids: Vec<Uuid> = page.iter().map(|p| p.author_id).collect();

    let comments = comments::table
        .filter(comments::post_id.eq_any(&post_ids))
        .group_by(comments::post_id)
        .select((comments::post_id, count(comments::id)))
        .load::<(Uuid, i64)>(conn)?
        .into_iter()
        .collect();

    let likes = likes::table
        .filter(likes::post_id.eq_any(&post_ids))
        .group_by(likes::post_id)
        .select((likes::post_id, count(likes::id)))
        .load::<(Uuid, i64)>(conn)?
        .into_iter()
        .collect();

    let authors = profiles::table
        .filter(profiles::id.eq_any(&author_ids))
        .select((profiles::id, profiles::username))
        .load::<(Uuid, String)>(conn)?
        .into_iter()
        .collect();

    let liked_by_me = likes::table
        .filter(likes::post_id.eq_any(&post_ids))
        .filter(likes::author_id.eq(viewer_id))
        .select(likes::post_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();

    Ok(FeedCounts { comments, likes, authors, liked_by_me })
}

pub fn like_count(conn: &mut PgConnection, post_id: Uuid) -> AppResult<i64> {
    let n = likes::table
        .filter(likes::post_id.eq(post_id))
        .count()
        .get_result::<i64>(conn)?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn post(author_id: Uuid, minutes_ago: i64) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id,
            description: format!("posted {minutes_ago} minutes ago"),
            image_url: None,
            date_posted: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn counts_attach_to_the_right_posts() {
        let author = Uuid::new_v4();
        let (newer, older) = (post(author, 1), post(author, 10));
        let counts = FeedCounts {
            comments: HashMap::from([(older.id, 3)]),
            likes: HashMap::from([(newer.id, 2), (older.id, 5)]),
            authors: HashMap::from([(author, "alice".to_string())]),
            liked_by_me: HashSet::from([older.id]),
        };

        let entries = assemble(vec![newer.clone(), older.clone()], &counts);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].post.id, newer.id);
        assert_eq!((entries[0].comment_count, entries[0].like_count), (0, 2));
        assert!(!entries[0].liked_by_me);
        assert_eq!((entries[1].comment_count, entries[1].like_count), (3, 5));
        assert!(entries[1].liked_by_me);
        assert_eq!(entries[1].author_username, "alice");
    }

    #[test]
    fn empty_page_assembles_to_nothing() {
        assert!(assemble(Vec::new(), &FeedCounts::default()).is_empty());
    }
}

//! Ingested social content.
//!
//! Posts pulled from external read-only social APIs are stored de-duplicated
//! on (platform, external id) so repeated polling reports only genuinely new
//! items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Source platform of an ingested post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Reddit,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Twitter => write!(f, "twitter"),
            Platform::Reddit => write!(f, "reddit"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twitter" => Ok(Platform::Twitter),
            "reddit" => Ok(Platform::Reddit),
            other => Err(format!("invalid platform: '{other}'")),
        }
    }
}

/// Shape of a post as published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Tweet,
    Article,
    Thread,
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostType::Tweet => write!(f, "tweet"),
            PostType::Article => write!(f, "article"),
            PostType::Thread => write!(f, "thread"),
        }
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tweet" => Ok(PostType::Tweet),
            "article" => Ok(PostType::Article),
            "thread" => Ok(PostType::Thread),
            other => Err(format!("invalid post type: '{other}'")),
        }
    }
}

/// A stored social post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialPost {
    pub id: Uuid,
    pub platform: Platform,
    pub external_id: String,
    pub author: String,
    pub content: String,
    pub url: String,
    pub subreddit: Option<String>,
    pub title: Option<String>,
    pub score: i64,
    pub reply_count: i64,
    pub repost_count: i64,
    pub post_type: PostType,
    /// The monitoring query that surfaced this post.
    pub source_query: String,
    pub posted_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}

/// A post as fetched from an external API, before ingestion.
#[derive(Debug, Clone)]
pub struct NewSocialPost {
    pub platform: Platform,
    pub external_id: String,
    pub author: String,
    pub content: String,
    pub url: String,
    pub subreddit: Option<String>,
    pub title: Option<String>,
    pub score: i64,
    pub reply_count: i64,
    pub repost_count: i64,
    pub post_type: PostType,
    pub source_query: String,
    pub posted_at: DateTime<Utc>,
}

//! SQLite-backed movie and review catalog.
//!
//! Tables:
//! - `movies`: title, director, genre, poster_url
//! - `reviews`: movie_id, author, content, rating, sentiment, created_at
//!
//! The sentiment column is NOT NULL and always holds one of the three
//! canonical label ids; raw arbiter text never reaches storage.

use crate::sentiment::Sentiment;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

// ── Records ──────────────────────────────────────────────────────

/// A movie in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub director: String,
    pub genre: String,
    pub poster_url: String,
}

/// Fields for a new movie.
#[derive(Debug, Clone)]
pub struct MovieDraft {
    pub title: String,
    pub director: String,
    pub genre: String,
    pub poster_url: String,
}

/// A stored review, including its canonical sentiment label.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: i64,
    pub movie_id: i64,
    pub author: String,
    pub content: String,
    pub rating: f64,
    pub sentiment: Sentiment,
    pub created_at: DateTime<Utc>,
}

/// Raw review row before the sentiment column is validated.
struct ReviewRow {
    id: i64,
    movie_id: i64,
    author: String,
    content: String,
    rating: f64,
    sentiment: String,
    created_at: String,
}

impl ReviewRow {
    fn into_review(self) -> Result<Review> {
        let sentiment = Sentiment::from_id(&self.sentiment).with_context(|| {
            format!(
                "review {} has non-canonical sentiment {:?}",
                self.id, self.sentiment
            )
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("review {} has invalid timestamp", self.id))?
            .with_timezone(&Utc);
        Ok(Review {
            id: self.id,
            movie_id: self.movie_id,
            author: self.author,
            content: self.content,
            rating: self.rating,
            sentiment,
            created_at,
        })
    }
}

// ── Store ────────────────────────────────────────────────────────

/// Movies seeded into an empty catalog.
const SEED_MOVIES: &[(&str, &str, &str, &str)] = &[
    (
        "타이타닉",
        "제임스 카메론",
        "로맨스",
        "https://media.themoviedb.org/t/p/w300_and_h450_face/132KjhVrWUqKFVfMAKKNkherytA.jpg",
    ),
    (
        "해리포터와 마법사의 돌",
        "크리스 콜럼버스",
        "판타지",
        "https://media.themoviedb.org/t/p/w300_and_h450_face/8YaP48tVfngbURGldWk1I5odsBK.jpg",
    ),
    (
        "인셉션",
        "크리스토퍼 놀란",
        "SF",
        "https://media.themoviedb.org/t/p/w300_and_h450_face/zTgjeblxSLSvomt6F6UYtpiD4n7.jpg",
    ),
];

/// SQLite-backed review catalog.
pub struct ReviewStore {
    conn: Mutex<Connection>,
}

impl ReviewStore {
    /// Open (or create) the catalog database at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database {}", db_path.display()))?;
        Self::with_connection(conn)
    }

    /// In-memory catalog, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                director TEXT NOT NULL,
                genre TEXT NOT NULL,
                poster_url TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
                author TEXT NOT NULL,
                content TEXT NOT NULL,
                rating REAL NOT NULL,
                sentiment TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_movie ON reviews(movie_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── Movies ───────────────────────────────────────────────────

    /// Seed the initial catalog when it is empty. Returns how many movies
    /// were inserted (zero when the catalog already has entries).
    pub fn seed_catalog(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(0);
        }

        for (title, director, genre, poster_url) in SEED_MOVIES {
            conn.execute(
                "INSERT INTO movies (title, director, genre, poster_url) VALUES (?1, ?2, ?3, ?4)",
                params![title, director, genre, poster_url],
            )?;
        }
        tracing::info!(movies = SEED_MOVIES.len(), "seeded empty movie catalog");
        Ok(SEED_MOVIES.len())
    }

    pub fn add_movie(&self, draft: &MovieDraft) -> Result<Movie> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO movies (title, director, genre, poster_url) VALUES (?1, ?2, ?3, ?4)",
            params![draft.title, draft.director, draft.genre, draft.poster_url],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Movie {
            id,
            title: draft.title.clone(),
            director: draft.director.clone(),
            genre: draft.genre.clone(),
            poster_url: draft.poster_url.clone(),
        })
    }

    pub fn get_movie(&self, id: i64) -> Result<Option<Movie>> {
        let conn = self.conn.lock();
        let movie = conn
            .query_row(
                "SELECT id, title, director, genre, poster_url FROM movies WHERE id = ?1",
                params![id],
                Self::map_movie,
            )
            .optional()?;
        Ok(movie)
    }

    pub fn list_movies(&self) -> Result<Vec<Movie>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, title, director, genre, poster_url FROM movies ORDER BY id")?;
        let movies = stmt
            .query_map([], Self::map_movie)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(movies)
    }

    /// Remove a movie and, via the FK cascade, all of its reviews.
    pub fn remove_movie(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM movies WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn map_movie(row: &rusqlite::Row<'_>) -> rusqlite::Result<Movie> {
        Ok(Movie {
            id: row.get(0)?,
            title: row.get(1)?,
            director: row.get(2)?,
            genre: row.get(3)?,
            poster_url: row.get(4)?,
        })
    }

    // ── Reviews ──────────────────────────────────────────────────

    pub fn insert_review(
        &self,
        movie_id: i64,
        author: &str,
        content: &str,
        rating: f64,
        sentiment: Sentiment,
        created_at: DateTime<Utc>,
    ) -> Result<Review> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reviews (movie_id, author, content, rating, sentiment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                movie_id,
                author,
                content,
                rating,
                sentiment.id(),
                created_at.to_rfc3339()
            ],
        )
        .with_context(|| format!("failed to insert review for movie {movie_id}"))?;

        Ok(Review {
            id: conn.last_insert_rowid(),
            movie_id,
            author: author.to_string(),
            content: content.to_string(),
            rating,
            sentiment,
            created_at,
        })
    }

    pub fn get_review(&self, id: i64) -> Result<Option<Review>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, movie_id, author, content, rating, sentiment, created_at
                 FROM reviews WHERE id = ?1",
                params![id],
                Self::map_review_row,
            )
            .optional()?;
        row.map(ReviewRow::into_review).transpose()
    }

    pub fn list_reviews(&self, movie_id: i64) -> Result<Vec<Review>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, movie_id, author, content, rating, sentiment, created_at
             FROM reviews WHERE movie_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![movie_id], Self::map_review_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ReviewRow::into_review).collect()
    }

    /// Persist edits to an existing review (all mutable fields, by id).
    pub fn update_review(&self, review: &Review) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE reviews SET author = ?2, content = ?3, rating = ?4, sentiment = ?5
             WHERE id = ?1",
            params![
                review.id,
                review.author,
                review.content,
                review.rating,
                review.sentiment.id()
            ],
        )?;
        if changed == 0 {
            bail!("review {} not found", review.id);
        }
        Ok(())
    }

    pub fn remove_review(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn map_review_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReviewRow> {
        Ok(ReviewRow {
            id: row.get(0)?,
            movie_id: row.get(1)?,
            author: row.get(2)?,
            content: row.get(3)?,
            rating: row.get(4)?,
            sentiment: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

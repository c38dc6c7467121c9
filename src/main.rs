//! reelsense CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use reelsense::config::{ArbiterMode, Config};
use reelsense::reviews::{ReviewDraft, ReviewPatch, ReviewService};
use reelsense::sentiment::arbiter::{KeyStatus, RemoteArbiter};
use reelsense::sentiment::SentimentRouter;
use reelsense::store::{MovieDraft, Review, ReviewStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reelsense", version, about = "Hybrid sentiment enrichment for movie reviews")]
struct Cli {
    /// Config file path (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Review database path (overrides the config file).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a piece of review text and print the label.
    Classify {
        text: String,
        /// Also print the routing detail (source, local confidence).
        #[arg(long)]
        verbose: bool,
    },
    /// Check the arbiter credential and list available models.
    Doctor,
    /// Manage the movie catalog.
    Movie {
        #[command(subcommand)]
        command: MovieCommand,
    },
    /// Manage reviews.
    Review {
        #[command(subcommand)]
        command: ReviewCommand,
    },
}

#[derive(Subcommand)]
enum MovieCommand {
    /// Add a movie to the catalog.
    Add {
        title: String,
        #[arg(long)]
        director: String,
        #[arg(long)]
        genre: String,
        #[arg(long, default_value = "")]
        poster_url: String,
    },
    /// List the catalog (seeds the initial movies on first use).
    List,
    /// Remove a movie and its reviews.
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum ReviewCommand {
    /// Add a review; its sentiment label is computed on the way in.
    Add {
        movie_id: i64,
        content: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        rating: f64,
    },
    /// Edit a review; the label is recomputed only if the content changed.
    Update {
        id: i64,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        rating: Option<f64>,
    },
    /// List reviews for a movie.
    List { movie_id: i64 },
    /// Remove a review.
    Remove { id: i64 },
}

fn print_review(review: &Review) {
    println!(
        "#{} [{}] {} ({}점) — {}",
        review.id,
        review.sentiment.label(),
        review.content,
        review.rating,
        review.author
    );
}

fn open_service(config: &Config, db_override: Option<&PathBuf>) -> Result<ReviewService> {
    let db_path = config.db_path(db_override.map(|p| p.as_path()))?;
    let store = Arc::new(ReviewStore::open(&db_path)?);
    let router = Arc::new(SentimentRouter::from_config(config));
    Ok(ReviewService::new(store, router))
}

fn open_store(config: &Config, db_override: Option<&PathBuf>) -> Result<Arc<ReviewStore>> {
    let db_path = config.db_path(db_override.map(|p| p.as_path()))?;
    Ok(Arc::new(ReviewStore::open(&db_path)?))
}

async fn run_doctor(config: &Config) {
    match config.arbiter_mode() {
        ArbiterMode::LocalOnly => {
            println!("키 없음 — 로컬 전용 모드로 동작합니다 (OPENAI_API_KEY 미설정)");
        }
        ArbiterMode::Hybrid { api_key } => {
            let arbiter = RemoteArbiter::new(
                &config.arbiter.api_base,
                api_key,
                &config.arbiter.model,
                config.arbiter.max_output_tokens,
                config.arbiter.timeout_secs,
            );
            match arbiter.check_key().await {
                KeyStatus::Valid { models } => {
                    println!("API 키 사용 가능");
                    println!("사용 가능한 모델 수: {}", models.len());
                    for model in models {
                        println!(" - {model}");
                    }
                }
                KeyStatus::AuthFailed => println!("API 키 인증 실패"),
                KeyStatus::PermissionDenied => println!("모델 접근 권한 없음"),
                KeyStatus::RateLimited => println!("키는 유효하지만 사용량 한도 초과"),
                KeyStatus::Unreachable(detail) => println!("서비스 연결 실패: {detail}"),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelsense=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Classify { text, verbose } => {
            let router = SentimentRouter::from_config(&config);
            let result = router.classify_detailed(&text).await;
            println!("{}", result.label.label());
            if verbose {
                println!(
                    "결정: {} / 로컬 {} (신뢰도 {:.2})",
                    result.source.describe(),
                    result.local.label.label(),
                    result.local.confidence
                );
            }
        }
        Command::Doctor => run_doctor(&config).await,
        Command::Movie { command } => {
            let store = open_store(&config, cli.db.as_ref())?;
            match command {
                MovieCommand::Add {
                    title,
                    director,
                    genre,
                    poster_url,
                } => {
                    let movie = store.add_movie(&MovieDraft {
                        title,
                        director,
                        genre,
                        poster_url,
                    })?;
                    println!("#{} {} 추가됨", movie.id, movie.title);
                }
                MovieCommand::List => {
                    store.seed_catalog()?;
                    for movie in store.list_movies()? {
                        println!(
                            "#{} {} — {} ({})",
                            movie.id, movie.title, movie.director, movie.genre
                        );
                    }
                }
                MovieCommand::Remove { id } => {
                    if store.remove_movie(id)? {
                        println!("#{id} 삭제됨");
                    } else {
                        println!("#{id} 없음");
                    }
                }
            }
        }
        Command::Review { command } => match command {
            ReviewCommand::Add {
                movie_id,
                content,
                author,
                rating,
            } => {
                let service = open_service(&config, cli.db.as_ref())?;
                let review = service
                    .create_review(
                        movie_id,
                        ReviewDraft {
                            author,
                            content,
                            rating,
                        },
                    )
                    .await?;
                print_review(&review);
            }
            ReviewCommand::Update {
                id,
                content,
                author,
                rating,
            } => {
                let service = open_service(&config, cli.db.as_ref())?;
                let review = service
                    .update_review(
                        id,
                        ReviewPatch {
                            author,
                            content,
                            rating,
                        },
                    )
                    .await?;
                print_review(&review);
            }
            ReviewCommand::List { movie_id } => {
                let store = open_store(&config, cli.db.as_ref())?;
                for review in store.list_reviews(movie_id)? {
                    print_review(&review);
                }
            }
            ReviewCommand::Remove { id } => {
                let store = open_store(&config, cli.db.as_ref())?;
                if store.remove_review(id)? {
                    println!("#{id} 삭제됨");
                } else {
                    println!("#{id} 없음");
                }
            }
        },
    }

    Ok(())
}

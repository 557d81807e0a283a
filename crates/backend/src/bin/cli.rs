use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::Client;
use shared_types::{EpisodeResponse, GenerateResponse, LoginInitResponse, SweepSummary};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "podbot-cli")]
#[command(about = "CLI for the daily podcast backend API")]
#[command(
    long_about = "A command-line interface for the podcast backend server.\n\n\
    Supports starting the login flow, listing episodes, fetching feeds, and\n\
    triggering episode generation. Generation sweeps are meant to be run\n\
    from a scheduler (cron) with the admin token."
)]
struct Cli {
    /// Backend server URL to connect to.
    ///
    /// The CLI will make HTTP requests to this server's API endpoints.
    /// Use this to connect to a remote server or a different port.
    #[arg(
        short,
        long,
        default_value = "http://localhost:8000",
        env = "PODBOT_API_URL"
    )]
    base_url: String,

    /// Session token for authenticated endpoints.
    ///
    /// Obtained from the /auth/google/callback response after login.
    #[arg(short, long, env = "PODBOT_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Google login URL to open in a browser
    Login,

    /// Check the server health endpoint
    Health,

    /// List a user's episodes, newest first
    Episodes {
        /// The user's UUID
        user_id: Uuid,
    },

    /// Fetch and print a user's RSS feed XML by public feed id
    Feed {
        /// Opaque feed id from the user's feed URL
        feed_id: String,
    },

    /// Generate today's daily briefing episode for a user
    GenerateDaily {
        /// The user's UUID
        user_id: Uuid,
    },

    /// Generate a welcome episode for a user
    GenerateWelcome {
        /// The user's UUID
        user_id: Uuid,
    },

    /// Generate a document review episode
    GenerateDocument {
        /// The user's UUID
        user_id: Uuid,

        /// The Google Doc id to review
        document_id: String,
    },

    /// Run the daily generation sweep over all active users.
    ///
    /// Requires the server's ADMIN_TOKEN. Intended for cron.
    Sweep {
        /// Shared admin secret configured on the server
        #[arg(long, env = "PODBOT_ADMIN_TOKEN")]
        admin_token: String,
    },
}

fn print_episode(episode: &EpisodeResponse) {
    let status = if episode.audio_url.is_empty() {
        "pending"
    } else {
        "published"
    };
    println!(
        "[{}] {} ({}, {})",
        &episode.id.to_string()[..8],
        episode.title,
        episode.episode_type,
        status
    );
    if !episode.audio_url.is_empty() {
        println!(
            "    {} ({}s, {} bytes)",
            episode.audio_url, episode.duration_seconds, episode.file_size_bytes
        );
    }
}

fn authorized(request: reqwest::RequestBuilder, token: &Option<String>) -> reqwest::RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.base_url.trim_end_matches('/');

    match cli.command {
        Commands::Login => {
            let url = format!("{}/auth/google/login", base_url);
            let response: LoginInitResponse = client
                .get(&url)
                .send()
                .await?
                .error_for_status()
                .context("Login init failed")?
                .json()
                .await?;
            println!("Open this URL in your browser to sign in:");
            println!("{}", response.auth_url);
        }
        Commands::Health => {
            let url = format!("{}/health", base_url);
            let status = client.get(&url).send().await?.status();
            println!("{}", status);
        }
        Commands::Episodes { user_id } => {
            let url = format!("{}/users/{}/episodes", base_url, user_id);
            let episodes: Vec<EpisodeResponse> = authorized(client.get(&url), &cli.token)
                .send()
                .await?
                .error_for_status()
                .context("Episode listing failed")?
                .json()
                .await?;
            if episodes.is_empty() {
                println!("No episodes yet.");
            } else {
                for episode in &episodes {
                    print_episode(episode);
                }
            }
        }
        Commands::Feed { feed_id } => {
            let url = format!("{}/rss/{}", base_url, feed_id);
            let xml = client
                .get(&url)
                .send()
                .await?
                .error_for_status()
                .context("Feed fetch failed")?
                .text()
                .await?;
            println!("{}", xml);
        }
        Commands::GenerateDaily { user_id } => {
            let url = format!("{}/generate-podcast/{}", base_url, user_id);
            let response: GenerateResponse = authorized(client.post(&url), &cli.token)
                .send()
                .await?
                .error_for_status()
                .context("Daily generation failed")?
                .json()
                .await?;
            println!("Generated:");
            print_episode(&response.episode);
        }
        Commands::GenerateWelcome { user_id } => {
            let url = format!("{}/generate-welcome-podcast/{}", base_url, user_id);
            let response: GenerateResponse = authorized(client.post(&url), &cli.token)
                .send()
                .await?
                .error_for_status()
                .context("Welcome generation failed")?
                .json()
                .await?;
            println!("Generated:");
            print_episode(&response.episode);
        }
        Commands::GenerateDocument {
            user_id,
            document_id,
        } => {
            let url = format!(
                "{}/generate-document-podcast/{}/{}",
                base_url, user_id, document_id
            );
            let response: GenerateResponse = authorized(client.post(&url), &cli.token)
                .send()
                .await?
                .error_for_status()
                .context("Document generation failed")?
                .json()
                .await?;
            println!("Generated:");
            print_episode(&response.episode);
        }
        Commands::Sweep { admin_token } => {
            let url = format!("{}/admin/generate-all", base_url);
            let summary: SweepSummary = client
                .post(&url)
                .header("x-admin-token", admin_token)
                .send()
                .await?
                .error_for_status()
                .context("Sweep request failed")?
                .json()
                .await?;
            println!(
                "Sweep finished: {} users, {} succeeded, {} failed",
                summary.total_users, summary.successful, summary.failed
            );
            for error in &summary.errors {
                println!("  {}", error);
            }
        }
    }

    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared_types::{ErrorResponse, GoogleTokenRequest, LoginResponse, UserInfo};

#[derive(Parser)]
#[command(name = "familytask-cli")]
#[command(about = "CLI for the FamilyTask authentication API")]
#[command(
    long_about = "A command-line interface for the FamilyTask backend.\n\n\
    Exchanges a Google ID token for a session token and queries the user endpoints \
    with that session."
)]
struct Cli {
    /// Backend server URL to connect to.
    #[arg(
        short,
        long,
        default_value = "http://localhost:8080",
        env = "FAMILYTASK_API_URL"
    )]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server is up
    Health,

    /// Exchange a Google ID token for a session token
    ///
    /// Prints the session token on the first line so it can be captured
    /// into FAMILYTASK_TOKEN.
    Login {
        /// The raw Google ID token (a JWT).
        google_token: String,
    },

    /// Show the signed-in user
    Me {
        /// Session token returned by `login`.
        #[arg(short, long, env = "FAMILYTASK_TOKEN")]
        token: String,
    },

    /// List all users (requires the PARENT role)
    Users {
        #[arg(short, long, env = "FAMILYTASK_TOKEN")]
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.base_url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let response = send(client.get(format!("{}/auth/health", base_url))).await?;
            println!("{}", response.text().await?);
        }
        Commands::Login { google_token } => {
            let body = GoogleTokenRequest {
                token: Some(google_token),
            };
            let login: LoginResponse =
                fetch(client.post(format!("{}/auth/google-login", base_url)).json(&body)).await?;

            println!("{}", login.token);
            println!("Expires in {}s", login.expires_in);
            print_user(&login.user);
        }
        Commands::Me { token } => {
            let user: UserInfo = fetch(
                client
                    .get(format!("{}/users/me", base_url))
                    .bearer_auth(token),
            )
            .await?;
            print_user(&user);
        }
        Commands::Users { token } => {
            let users: Vec<UserInfo> = fetch(
                client
                    .get(format!("{}/users", base_url))
                    .bearer_auth(token),
            )
            .await?;
            if users.is_empty() {
                println!("No users found.");
            }
            for user in &users {
                print_user(user);
            }
        }
    }

    Ok(())
}

/// Send a request, turning non-2xx responses into an error carrying the
/// server's message.
async fn send(request: RequestBuilder) -> anyhow::Result<Response> {
    let response = request.send().await.context("Failed to reach server")?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(err) => match err.details {
            Some(details) => anyhow::bail!("{} ({}): {}", err.error, status, details),
            None => anyhow::bail!("{} ({})", err.error, status),
        },
        Err(_) => anyhow::bail!("Request failed ({}): {}", status, text),
    }
}

async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> anyhow::Result<T> {
    send(request)
        .await?
        .json()
        .await
        .context("Failed to parse server response")
}

fn print_user(user: &UserInfo) {
    println!(
        "[{}] {} <{}> {}",
        &user.id.to_string()[..8],
        user.name,
        user.email,
        user.role
    );
    if let Some(picture) = &user.picture_url {
        println!("    Picture: {}", picture);
    }
}

use clap::{Parser, Subcommand};
use pantry::{
    db,
    repositories::{SqlitePantryRepository, SqliteUserRepository},
    services::{
        pantry_service::PantryService,
        token_cipher::TokenCipher,
        user_service::{CreateUserRequest, UserService},
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;

const SEED_EMAIL: &str = "me@example.com";

#[derive(Parser)]
#[command(name = "pantry-cli")]
#[command(about = "CLI tool for managing Pantry Recipes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Secret management commands
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },

    /// Create a demo user with a stocked pantry
    Seed,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },

    /// List all users
    List {
        /// Maximum number of users to display
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        /// Offset for pagination
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Delete a user
    Delete {
        /// Email address of the user to delete
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum SecretCommands {
    /// Print fresh values for MAGIC_LINK_SECRET and AUTH_COOKIE_SECRETS
    Generate,
}

async fn connect() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let pool = db::create_pool(&database_url).await?;
    db::run_migrations(&pool).await?;
    Ok(pool)
}

fn user_service(pool: &SqlitePool) -> UserService {
    UserService::new(Arc::new(SqliteUserRepository::new(pool.clone())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Secret {
            command: SecretCommands::Generate,
        } => {
            println!("MAGIC_LINK_SECRET={}", TokenCipher::generate_secret());
            println!(
                "AUTH_COOKIE_SECRETS={}",
                TokenCipher::generate_secret_of_len(64)
            );
        }

        Commands::User { command } => {
            let user_service = user_service(&connect().await?);
            match command {
                UserCommands::Create {
                    email,
                    first_name,
                    last_name,
                } => {
                    let request = CreateUserRequest {
                        email,
                        first_name,
                        last_name,
                    };

                    match user_service.create_user(request).await {
                        Ok(user) => {
                            println!("✅ User created successfully!");
                            println!("  ID: {}", user.id);
                            println!("  Email: {}", user.email);
                            println!("  Name: {}", user.full_name());
                        }
                        Err(err) => {
                            eprintln!("❌ Failed to create user: {}", err);
                            std::process::exit(1);
                        }
                    }
                }

                UserCommands::List { limit, offset } => {
                    match user_service.list_users(Some(limit), Some(offset)).await {
                        Ok(users) => {
                            if users.is_empty() {
                                println!("No users found.");
                            } else {
                                println!(
                                    "{:<5} {:<40} {:<30} {:<20}",
                                    "ID", "Email", "Name", "Created"
                                );
                                println!("{}", "-".repeat(95));
                                for user in users {
                                    println!(
                                        "{:<5} {:<40} {:<30} {:<20}",
                                        user.id,
                                        user.email,
                                        user.full_name(),
                                        user.created_at
                                    );
                                }
                            }
                        }
                        Err(err) => {
                            eprintln!("❌ Failed to list users: {}", err);
                            std::process::exit(1);
                        }
                    }
                }

                UserCommands::Delete { email } => match user_service.find_user_by_email(&email).await {
                    Ok(Some(user)) => match user_service.delete_user(user.id).await {
                        Ok(()) => {
                            println!("✅ User '{}' deleted successfully!", email);
                        }
                        Err(err) => {
                            eprintln!("❌ Failed to delete user: {}", err);
                            std::process::exit(1);
                        }
                    },
                    Ok(None) => {
                        eprintln!("❌ User '{}' not found", email);
                        std::process::exit(1);
                    }
                    Err(err) => {
                        eprintln!("❌ Failed to find user: {}", err);
                        std::process::exit(1);
                    }
                },
            }
        }

        Commands::Seed => {
            let pool = connect().await?;
            let user_service = user_service(&pool);
            let pantry_service =
                PantryService::new(Arc::new(SqlitePantryRepository::new(pool.clone())));

            let user = match user_service.find_user_by_email(SEED_EMAIL).await? {
                Some(user) => user,
                None => {
                    user_service
                        .create_user(CreateUserRequest {
                            email: SEED_EMAIL.to_string(),
                            first_name: "Alice".to_string(),
                            last_name: "Johnson".to_string(),
                        })
                        .await?
                }
            };

            let shelves = [
                ("Dairy", ["Milk", "Eggs", "Cheese"]),
                ("Fruits", ["Apples", "Oranges", "Grapes"]),
            ];
            for (shelf_name, items) in shelves {
                let shelf = pantry_service
                    .find_or_create_shelf(user.id, shelf_name)
                    .await?;
                for item in items {
                    pantry_service.create_item(user.id, shelf.id, item).await?;
                }
            }

            println!("✅ Seeded {} ({})", user.email, user.full_name());
        }
    }

    Ok(())
}

//! Return Desk CLI - migrations, admin users, API tokens, and the review queue.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rd-cli migrate
//!
//! # Create admin user and give them a token
//! rd-cli admin create -e admin@example.com -n "Admin Name" -r super_admin
//! rd-cli token issue --admin-email admin@example.com --label laptop
//!
//! # Work the review queue through the API
//! rd-cli returns list --status pending
//! rd-cli returns approve 1001 --comment "Refunding in full"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin` - Create and list admin users
//! - `token` - Issue, list, and revoke API tokens
//! - `returns` - List and decide return requests via `RD_API_URL`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};

use returndesk_core::{OrderId, StatusFilter};

mod commands;

use commands::returns::Action;

#[derive(Parser)]
#[command(name = "rd-cli")]
#[command(author, version, about = "Return Desk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage API tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Review return requests through the API
    Returns {
        #[command(subcommand)]
        action: ReturnsAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
    /// List admin users
    List,
}

/// Whose token to act on.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct OwnerArgs {
    /// Admin user's email
    #[arg(long)]
    admin_email: Option<String>,

    /// Customer ID
    #[arg(long)]
    customer_id: Option<i32>,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a new token (printed once)
    Issue {
        #[command(flatten)]
        owner: OwnerArgs,

        /// Label to recognize the token by
        #[arg(short, long, default_value = "cli")]
        label: String,
    },
    /// List active tokens
    List {
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Revoke a token by ID
    Revoke {
        /// Token ID
        id: i32,
    },
}

#[derive(Subcommand)]
enum ReturnsAction {
    /// List return requests, newest first
    List {
        /// Status filter (`all`, `pending`, `approved`, `rejected`, `completed`)
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,

        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show requests per status
    Counts,
    /// Show one return request
    Show {
        /// Order ID
        order_id: i32,
    },
    /// Open a return request on the customer's behalf
    Initiate {
        /// Order ID
        order_id: i32,
    },
    /// Approve a pending request
    Approve {
        /// Order ID
        order_id: i32,

        /// Comment shown to the customer
        #[arg(short, long)]
        comment: String,

        /// Refund amount (defaults to the order total)
        #[arg(short, long, default_value = "")]
        refund: String,
    },
    /// Reject a pending request
    Reject {
        /// Order ID
        order_id: i32,

        /// Comment shown to the customer
        #[arg(short, long)]
        comment: String,
    },
    /// Complete an approved request
    Complete {
        /// Order ID
        order_id: i32,
    },
}

impl From<ReturnsAction> for Action {
    fn from(action: ReturnsAction) -> Self {
        match action {
            ReturnsAction::List { status, page } => Self::List { status, page },
            ReturnsAction::Counts => Self::Counts,
            ReturnsAction::Show { order_id } => Self::Show(OrderId::new(order_id)),
            ReturnsAction::Initiate { order_id } => Self::Initiate(OrderId::new(order_id)),
            ReturnsAction::Approve {
                order_id,
                comment,
                refund,
            } => Self::Approve {
                order_id: OrderId::new(order_id),
                comment,
                refund,
            },
            ReturnsAction::Reject { order_id, comment } => Self::Reject {
                order_id: OrderId::new(order_id),
                comment,
            },
            ReturnsAction::Complete { order_id } => Self::Complete(OrderId::new(order_id)),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => {
            let pool = commands::connect().await?;
            match action {
                AdminAction::Create { email, name, role } => {
                    commands::admin::create_user(&pool, &email, &name, &role).await?;
                }
                AdminAction::List => commands::admin::list_users(&pool).await?,
            }
        }
        Commands::Token { action } => {
            let pool = commands::connect().await?;
            match action {
                TokenAction::Issue { owner, label } => {
                    let owner = commands::token::owner(
                        &pool,
                        owner.admin_email.as_deref(),
                        owner.customer_id,
                    )
                    .await?;
                    commands::token::issue(&pool, owner, &label).await?;
                }
                TokenAction::List { owner } => {
                    let owner = commands::token::owner(
                        &pool,
                        owner.admin_email.as_deref(),
                        owner.customer_id,
                    )
                    .await?;
                    commands::token::list(&pool, owner).await?;
                }
                TokenAction::Revoke { id } => commands::token::revoke(&pool, id).await?,
            }
        }
        Commands::Returns { action } => commands::returns::run(action.into()).await?,
    }
    Ok(())
}

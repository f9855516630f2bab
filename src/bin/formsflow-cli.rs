use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "formsflow-cli")]
#[command(about = "Management CLI for the formsflow group API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Bearer token of a user holding the admin role.
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API status
    Status,
    /// Manage groups
    #[command(subcommand)]
    Groups(GroupCommands),
    /// Manage users and group membership
    #[command(subcommand)]
    Users(UserCommands),
}

#[derive(Subcommand)]
enum GroupCommands {
    /// List all groups as a flat list
    List {
        #[arg(long)]
        search: Option<String>,
        /// "asc" or "desc"
        #[arg(long)]
        sort: Option<String>,
    },
    /// Show one group
    Get { id: String },
    /// Create a group; `/` in the name creates parent groups
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "permission")]
        permissions: Vec<String>,
    },
    /// Delete a group
    Delete { id: String },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users, optionally restricted to a group
    List {
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// Include each user's groups
        #[arg(long)]
        role: bool,
        #[arg(long)]
        count: bool,
    },
    /// Add a user to a group
    Add { user_id: String, group_id: String },
    /// Remove a user from a group
    Remove { user_id: String, group_id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/').to_string();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
    }

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/status", base)),
        Commands::Groups(GroupCommands::List { search, sort }) => {
            let mut query = Vec::new();
            if let Some(search) = search {
                query.push(("search", search));
            }
            if let Some(sort) = sort {
                query.push(("sortOrder", sort));
            }
            client.get(format!("{}/groups", base)).query(&query)
        }
        Commands::Groups(GroupCommands::Get { id }) => {
            client.get(format!("{}/groups/{}", base, id))
        }
        Commands::Groups(GroupCommands::Create {
            name,
            description,
            permissions,
        }) => client.post(format!("{}/groups", base)).json(&json!({
            "name": name,
            "description": description,
            "permissions": permissions,
        })),
        Commands::Groups(GroupCommands::Delete { id }) => {
            client.delete(format!("{}/groups/{}", base, id))
        }
        Commands::Users(UserCommands::List {
            group,
            search,
            page,
            limit,
            role,
            count,
        }) => {
            let mut query: Vec<(&str, String)> =
                vec![("role", role.to_string()), ("count", count.to_string())];
            if let Some(group) = group {
                query.push(("memberOfGroup", group));
            }
            if let Some(search) = search {
                query.push(("search", search));
            }
            if let Some(page) = page {
                query.push(("pageNo", page.to_string()));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            client.get(format!("{}/user", base)).query(&query)
        }
        Commands::Users(UserCommands::Add { user_id, group_id }) => client
            .put(format!("{}/user/{}/permission/groups/{}", base, user_id, group_id))
            .json(&json!({ "userId": user_id, "groupId": group_id })),
        Commands::Users(UserCommands::Remove { user_id, group_id }) => {
            client.delete(format!("{}/user/{}/permission/groups/{}", base, user_id, group_id))
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}

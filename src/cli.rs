use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;
use log::{debug, error, info};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Style},
    Table,
};

use crate::config::{Config, CONFIG};
use crate::entities::{Batch, Branch, Entity, EntityKind, HodLeave, User};
use crate::error::CampusError;
use crate::list::query::{MONTH, ROLE, SEARCH, STATUS};
use crate::list::{build_http_client, ListDisplay, ListQuery, ListView, RestResource};
use crate::logging::init_logging;
use crate::notify::ConsoleNotifier;
use crate::session::Session;

#[derive(Parser)]
#[command(
    name = "campusdesk",
    version,
    about = "campusdesk: browse and manage college administration records"
)]
pub struct Cli {
    /// Backend API base URL (overrides the configured one)
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Bearer token (overrides the configured one)
    #[arg(long = "token", global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show one page of a collection
    List {
        #[command(flatten)]
        list: ListArgs,
    },

    /// Delete a record, then show the refreshed page
    Delete {
        #[command(flatten)]
        list: ListArgs,

        /// ID of the record to delete
        id: i64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Collection: users, branches, hod-leaves or batches
    pub entity: EntityKind,

    /// Page to show (default: 1)
    #[arg(long = "page", short = 'p', default_value_t = 1)]
    pub page: u32,

    /// Rows per page, 1 to 100 (default: from config)
    #[arg(long = "page-size", short = 'n', value_parser = clap::value_parser!(u32).range(1..=100))]
    pub page_size: Option<u32>,

    /// Only users with this role
    #[arg(long = "role")]
    pub role: Option<String>,

    /// Only leaves with this status (pending, approved, rejected)
    #[arg(long = "status")]
    pub status: Option<String>,

    /// Only leaves in this month (YYYY-MM)
    #[arg(long = "month")]
    pub month: Option<String>,

    /// Free-text search
    #[arg(long = "search", short = 's')]
    pub search: Option<String>,
}

impl ListArgs {
    /// Builds the opening query, rejecting filters the collection does not support
    fn to_query(&self, default_page_size: u32) -> Result<ListQuery, CampusError> {
        let mut query = ListQuery::new(self.page_size.unwrap_or(default_page_size));
        let requested = [
            (ROLE, &self.role),
            (STATUS, &self.status),
            (MONTH, &self.month),
            (SEARCH, &self.search),
        ];

        for (key, value) in requested {
            let Some(value) = value else { continue };
            if !self.entity.filters().contains(&key) {
                return Err(CampusError::Error(format!(
                    "{} cannot be filtered by {}",
                    self.entity.long_name(),
                    key
                )));
            }
            query = query.with_filter(key, value);
        }

        Ok(query.with_page(self.page))
    }
}

impl Cli {
    pub fn handle_command_line() -> Result<(), CampusError> {
        let args = Cli::parse();

        let project_dirs = ProjectDirs::from("", "", "campusdesk").ok_or_else(|| {
            CampusError::Error("Could not determine the campusdesk data directory".to_owned())
        })?;
        let mut config = Config::load_config(&project_dirs);
        if let Some(base_url) = &args.base_url {
            config.backend.base_url = base_url.trim_end_matches('/').to_owned();
        }
        if let Some(token) = &args.token {
            config.backend.token = token.clone();
        }

        let log_dir = project_dirs.data_local_dir().join("logs");
        let _logger = init_logging(&config.logging, &log_dir)?;
        debug!("Configuration: {:?}", config);

        let _ = CONFIG.set(config);

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| CampusError::Error(format!("Failed to create runtime: {}", e)))?;

        let result = rt.block_on(Self::run(args.command));
        if let Err(err) = &result {
            error!("{:?}", err);
        }
        result
    }

    async fn run(command: Command) -> Result<(), CampusError> {
        let (list, delete_id) = match command {
            Command::List { list } => (list, None),
            Command::Delete { list, id } => (list, Some(id)),
        };

        match list.entity {
            EntityKind::Users => Self::run_for::<User>(&list, delete_id).await,
            EntityKind::Branches => Self::run_for::<Branch>(&list, delete_id).await,
            EntityKind::HodLeaves => Self::run_for::<HodLeave>(&list, delete_id).await,
            EntityKind::Batches => Self::run_for::<Batch>(&list, delete_id).await,
        }
    }

    async fn run_for<T: Entity + Clone>(
        list: &ListArgs,
        delete_id: Option<i64>,
    ) -> Result<(), CampusError> {
        let config = Config::get();
        let query = list.to_query(config.lists.page_size)?;

        let client = build_http_client(&config.backend)?;
        let session = Arc::new(Session::new(config.backend.token.clone()));
        let resource: RestResource<T> =
            RestResource::new(client, &config.backend.base_url, session);
        let view = ListView::with_query(resource, Arc::new(ConsoleNotifier), query);

        info!("Loading {} from {}", list.entity, config.backend.base_url);
        view.load().await;

        if let Some(id) = delete_id {
            let outcome = view
                .apply_mutation(view.delete_kind(id), view.fetcher().delete(id))
                .await?;
            for (field, messages) in &outcome.field_errors {
                eprintln!("  {}: {}", field, messages.join(" "));
            }
        }

        match view.display() {
            ListDisplay::Table(items) => {
                println!("{}", render_table(T::COLUMNS, items.iter().map(Entity::row)));
                println!(
                    "page {} of {} ({} total)",
                    view.page(),
                    view.total_pages(),
                    view.total_count()
                );
                Ok(())
            }
            ListDisplay::Empty => {
                println!("No results");
                Ok(())
            }
            ListDisplay::Error(message) => Err(CampusError::Reported(message)),
            ListDisplay::Idle | ListDisplay::Loading => Ok(()),
        }
    }
}

fn render_table<I>(columns: &[&str], rows: I) -> Table
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut builder = Builder::new();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.modify(Rows::first(), Alignment::center());
    table
}

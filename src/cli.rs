use std::path::PathBuf;

use owo_colors::OwoColorize;

use crate::agents::{suggested_filename, AgentApi, AgentService};
use crate::catalog::CatalogState;
use crate::client::HttpClient;
use crate::config::{default_config_path, HubConfig};
use crate::download::{DownloadManager, DownloadOutcome, RECONCILE_DELAY};
use crate::error::{AhubError, Result};
use crate::ui::{create_download_bar, format_size_colored, UI};
use crate::version::CURRENT_VERSION;
use crate::{
    BrowseArgs, Commands, ConfigArgs, ConfigCommand, DownloadArgs, LoginArgs, SearchArgs, ShowArgs,
};

/// CLI handler for processing commands
pub struct CliHandler {
    config_path: Option<PathBuf>,
    ui: UI,
}

impl CliHandler {
    /// Create a new CLI handler with a custom config path
    pub fn with_config_path(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            ui: UI::new(),
        }
    }

    /// Load configuration using the handler's config path
    async fn load_config(&self) -> Result<HubConfig> {
        if let Some(path) = &self.config_path {
            HubConfig::load_from(path).await
        } else {
            HubConfig::load().await
        }
    }

    async fn connect(&self) -> Result<HttpClient> {
        let config = self.load_config().await?;
        HttpClient::new(config.to_client_config())
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout().await,
            Commands::Status => self.handle_status().await,
            Commands::Browse(args) => self.handle_browse(args).await,
            Commands::Search(args) => self.handle_search(args).await,
            Commands::Show(args) => self.handle_show(args).await,
            Commands::Download(args) => self.handle_download(args).await,
            Commands::Config(args) => self.handle_config(args).await,
        }
    }

    /// Handle login command
    async fn handle_login(&mut self, args: LoginArgs) -> Result<()> {
        let client = self.connect().await?;

        let api_key = match args.api_key {
            Some(key) => key,
            None => dialoguer::Password::new()
                .with_prompt("API key")
                .interact()?,
        };

        client.authenticate(api_key).await?;

        let username = self
            .ui
            .format_user_field(client.current_username());
        self.ui.success(&format!("Logged in as {}", username));
        Ok(())
    }

    /// Handle logout command
    async fn handle_logout(&mut self) -> Result<()> {
        let client = self.connect().await?;
        client.logout().await?;
        self.ui.success("Logged out");
        Ok(())
    }

    /// Handle status command
    async fn handle_status(&mut self) -> Result<()> {
        let client = self.connect().await?;

        let server_result: Result<crate::client::ApiResponse<serde_json::Value>> = client
            .request::<(), _>(reqwest::Method::GET, "/health", None)
            .await;
        let (connected, server_msg) = match server_result {
            Ok(_) => (true, String::new()),
            Err(e) => (false, e.to_string()),
        };

        let authenticated = client.is_authenticated();
        let mut status_info = vec![
            ("Version", CURRENT_VERSION.to_string()),
            (
                "Authentication",
                self.ui.format_auth_status(authenticated, false),
            ),
        ];

        if authenticated {
            status_info.push((
                "Username",
                self.ui.format_user_field(client.current_username()),
            ));
        }

        status_info.push((
            "Server",
            if connected {
                self.ui.format_server_status(true)
            } else {
                format!("{} ({})", self.ui.format_server_status(false), server_msg)
            },
        ));
        status_info.push(("Endpoint", client.config().base_url));

        self.ui.card("Status", status_info);
        Ok(())
    }

    /// Handle browse command - list the catalog with filters and sort
    async fn handle_browse(&mut self, args: BrowseArgs) -> Result<()> {
        let client = self.connect().await?;
        let viewer = client.viewer();

        if args.mine && !viewer.is_authenticated() {
            self.ui
                .warning("Not logged in; showing all agents instead of only yours.");
        }

        let service = AgentService::new(client);
        let mut catalog = CatalogState::new(service, viewer);
        catalog.load_all(args.category.clone()).await;

        if let Some(error) = catalog.page_error() {
            return Err(AhubError::network(error));
        }

        catalog.set_sort_key(args.sort);
        catalog.set_mine_only(args.mine && viewer.is_authenticated());

        self.ui.header("Agent Catalog");
        self.print_category_counts(&catalog);
        self.print_agent_list(&catalog.visible());
        Ok(())
    }

    /// Handle search command
    async fn handle_search(&mut self, args: SearchArgs) -> Result<()> {
        let client = self.connect().await?;
        let viewer = client.viewer();

        let service = AgentService::new(client);
        let mut catalog = CatalogState::new(service, viewer);
        catalog.search(&args.term).await;

        if let Some(error) = catalog.page_error() {
            return Err(AhubError::network(error));
        }

        self.ui
            .header(&format!("Search results for \"{}\"", args.term.trim()));
        self.print_agent_list(&catalog.visible());
        Ok(())
    }

    /// Handle show command - detail card for one agent
    async fn handle_show(&mut self, args: ShowArgs) -> Result<()> {
        let client = self.connect().await?;
        let service = AgentService::new(client);
        let agent = service.get_agent(args.id).await?;

        self.ui.card(
            &agent.name,
            vec![
                ("ID", agent.id.to_string()),
                ("Category", agent.category.clone()),
                ("Author", agent.author_name.clone()),
                ("Downloads", agent.download_count.to_string()),
                ("Size", format_size_colored(agent.file_size)),
                ("Created", agent.created_at.clone()),
                ("Description", agent.description.clone()),
            ],
        );
        Ok(())
    }

    /// Handle download command
    async fn handle_download(&mut self, args: DownloadArgs) -> Result<()> {
        let config = self.load_config().await?;
        let client = HttpClient::new(config.to_client_config())?;
        let viewer = client.viewer();

        let service = AgentService::new(client);
        let agent = service.get_agent(args.id).await?;

        let dest = match args.output {
            Some(path) => path,
            None => config.download_dir.join(suggested_filename(&agent)),
        };

        let mut catalog = CatalogState::new(service, viewer);
        catalog.load_all(None).await;

        let manager = DownloadManager::new();
        let pb = create_download_bar(&agent.name);

        let outcome = manager
            .download(catalog.api(), args.id, &dest, |progress| {
                pb.set_position(progress as u64)
            })
            .await;

        match outcome {
            DownloadOutcome::Completed(receipt) => {
                pb.finish_and_clear();
                catalog.note_download_success(args.id);
                self.ui.success(&format!(
                    "Downloaded {} ({}) to {}",
                    agent.name,
                    format_size_colored(receipt.bytes_written),
                    dest.display()
                ));
                if let Some(message) = receipt.message {
                    self.ui.info(&message);
                }

                // Settle the optimistic count against the backend.
                tokio::time::sleep(RECONCILE_DELAY).await;
                catalog.refresh_after_mutation().await;
                if let Some(current) = catalog.agents().iter().find(|a| a.id == args.id) {
                    self.ui.info(&format!(
                        "{} has been downloaded {} times",
                        current.name, current.download_count
                    ));
                }
                Ok(())
            }
            DownloadOutcome::Failed(message) => {
                pb.abandon();
                self.ui.error(&message);
                Err(AhubError::download(message))
            }
            DownloadOutcome::AlreadyDownloading => {
                // Single attempt per invocation; nothing else can hold the slot.
                Ok(())
            }
        }
    }

    /// Handle config command
    async fn handle_config(&mut self, args: ConfigArgs) -> Result<()> {
        let config_path = self
            .config_path
            .clone()
            .unwrap_or_else(default_config_path);
        let mut config = self.load_config().await?;

        match args.command {
            ConfigCommand::Show => {
                self.ui.card(
                    "Configuration",
                    vec![
                        ("Endpoint", config.endpoint.clone()),
                        ("Timeout", format!("{}s", config.timeout)),
                        ("Verbose", config.verbose.to_string()),
                        (
                            "Download dir",
                            config.download_dir.display().to_string(),
                        ),
                        (
                            "Token storage",
                            if config.token_storage_enabled {
                                "enabled".to_string()
                            } else {
                                "disabled".to_string()
                            },
                        ),
                    ],
                );
            }
            #[cfg(debug_assertions)]
            ConfigCommand::SetEndpoint { url } => {
                config.endpoint = url;
                config.save(&config_path).await?;
                self.ui.success("Endpoint updated");
            }
            ConfigCommand::SetTimeout { seconds } => {
                if seconds == 0 {
                    return Err(AhubError::invalid_input("Timeout must be positive"));
                }
                config.timeout = seconds;
                config.save(&config_path).await?;
                self.ui.success("Timeout updated");
            }
            ConfigCommand::SetDownloadDir { path } => {
                config.download_dir = path;
                config.save(&config_path).await?;
                self.ui.success("Download directory updated");
            }
            ConfigCommand::SetVerbose { enabled } => {
                config.verbose = match enabled.as_str() {
                    "true" | "on" | "1" => true,
                    "false" | "off" | "0" => false,
                    other => {
                        return Err(AhubError::invalid_input(format!(
                            "Expected true/false, got '{}'",
                            other
                        )))
                    }
                };
                config.save(&config_path).await?;
                self.ui.success("Verbose setting updated");
            }
            ConfigCommand::Reset => {
                config = HubConfig::default();
                config.save(&config_path).await?;
                self.ui.success("Configuration reset to defaults");
            }
        }
        Ok(())
    }

    fn print_category_counts<A: AgentApi>(&self, catalog: &CatalogState<A>) {
        if catalog.category_counts().is_empty() {
            return;
        }

        let mut entries: Vec<_> = catalog.category_counts().iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let line = entries
            .iter()
            .map(|(category, count)| format!("{} ({})", category, count))
            .collect::<Vec<_>>()
            .join("  ");
        println!("Categories: {}", line);
        self.ui.separator();
    }

    fn print_agent_list(&self, agents: &[ahub_protocol::Agent]) {
        if agents.is_empty() {
            self.ui.info("No agents found.");
            return;
        }

        for agent in agents {
            if self.ui.supports_color() {
                println!(
                    "{:>6}  {:<32}  {:<16}  {:>8}  {}",
                    agent.id,
                    agent.name.bold(),
                    agent.category.dimmed(),
                    agent.download_count,
                    agent.created_at
                );
            } else {
                println!(
                    "{:>6}  {:<32}  {:<16}  {:>8}  {}",
                    agent.id, agent.name, agent.category, agent.download_count, agent.created_at
                );
            }
        }
        self.ui.blank_line();
        self.ui
            .info(&format!("{} agent(s) listed", agents.len()));
    }
}

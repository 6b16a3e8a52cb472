use anyhow::{Context, Result};
use asset_repo::api::ApiClient;
use asset_repo::config::ClientConfig;
use asset_repo::domain::asset::Asset;
use asset_repo::domain::media::UploadFile;
use asset_repo::domain::project::{Project, ProjectId};
use asset_repo::domain::user::RegisterRequest;
use asset_repo::routing::{GuardDecision, Route, RouteGuard};
use asset_repo::services::{
    AppError, AssetScope, AssetService, AuthService, ListState, NotificationCenter, NotificationKind,
    ProjectService, UploadObserver, UploadState, UserSearch, asset_service, project_service,
};
use asset_repo::session::{CookieCredentialStore, Session};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

/// Command-line client for the asset repository
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API origin for this invocation
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session cookie
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Post-login return path, as produced by the route guard
        #[arg(long)]
        next: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        password_confirmation: Option<String>,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Project, asset and membership counters for the signed-in user
    Stats,
    #[command(subcommand)]
    Projects(ProjectCommand),
    #[command(subcommand)]
    Assets(AssetCommand),
    #[command(subcommand)]
    Users(UserCommand),
    /// Evaluate the route guard for a path
    Route { path: String },
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Case-insensitive filter
    #[arg(long, default_value = "")]
    query: String,

    #[arg(long, default_value_t = 1)]
    page: usize,
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    List(ListArgs),
    Show { id: ProjectId },
    Create { name: String, url: String },
    Update {
        id: ProjectId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// KEY=VALUE; keys are normalized to UPPER_SNAKE_CASE
        #[arg(long = "extra", value_parser = parse_extra)]
        extra: Vec<(String, String)>,
        /// Drop an extra-data entry by key
        #[arg(long = "remove-extra")]
        remove_extra: Vec<String>,
        #[arg(long)]
        add_member: Option<String>,
    },
    Delete { id: ProjectId },
}

#[derive(Subcommand, Debug)]
enum AssetCommand {
    /// Assets of one project
    List {
        project: ProjectId,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Assets across every project you can see
    Mine(ListArgs),
    Show { id: i64 },
    Upload {
        project: ProjectId,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Look up users by email
    Search { email: String },
}

fn parse_extra(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))
}

fn load_config(path: Option<&std::path::Path>) -> Result<ClientConfig> {
    match path {
        Some(path) => {
            let mut config = ClientConfig::load_from(path)?;
            config.apply_env();
            Ok(config)
        }
        None => ClientConfig::load(),
    }
}

struct App {
    config: ClientConfig,
    api: ApiClient,
    notifications: NotificationCenter,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = load_config(cli.config.as_deref())?;
        if let Some(url) = &cli.api_url {
            config.api_base_url = url.clone();
        }

        let cookie_path = config.resolved_cookie_path()?;
        let session = Session::new(Arc::new(CookieCredentialStore::new(cookie_path)));
        let api = ApiClient::from_config(&config, session)?;
        Ok(Self {
            notifications: NotificationCenter::new(config.notification_duration()),
            config,
            api,
        })
    }

    fn session(&self) -> Session {
        self.api.session().clone()
    }

    fn auth(&self) -> AuthService {
        AuthService::new(Arc::new(self.api.auth.clone()), self.session())
    }

    fn projects(&self) -> ProjectService {
        ProjectService::new(Arc::new(self.api.projects.clone()))
    }

    fn assets(&self, scope: AssetScope) -> AssetService {
        let assets = Arc::new(self.api.assets.clone());
        AssetService::new(assets.clone(), assets, scope)
    }

    fn notify(&mut self, kind: NotificationKind, message: &str) {
        self.notifications.push(kind, message);
        self.flush();
    }

    /// Prints every live notification, oldest first, then dismisses it.
    fn flush(&mut self) {
        let shown: Vec<u64> = self
            .notifications
            .active(Instant::now())
            .into_iter()
            .map(|notification| {
                match notification.kind {
                    NotificationKind::Error | NotificationKind::Warning => {
                        eprintln!("{}: {}", notification.kind.label(), notification.message)
                    }
                    _ => println!("{}", notification.message),
                }
                notification.id
            })
            .collect();
        for id in shown {
            self.notifications.dismiss(id);
        }
    }
}

/// Renders batch progress on one terminal line.
struct ProgressLine;

impl UploadObserver for ProgressLine {
    fn on_state(&self, state: &UploadState) {
        match state {
            UploadState::Uploading {
                current,
                total,
                file_name,
                overall_percent,
                ..
            } => eprint!("\r[{}/{}] {} {:>3}%", current, total, file_name, overall_percent),
            UploadState::Succeeded { .. } | UploadState::Failed { .. } => eprintln!(),
            _ => {}
        }
    }
}

fn print_page<T>(list: &ListState<T>, row: impl Fn(&T) -> String)
where
    T: asset_repo::services::list_state::Searchable,
{
    let visible = list.visible_slice();
    if visible.is_empty() {
        println!("Nothing to show.");
        return;
    }
    for item in visible {
        println!("{}", row(item));
    }
    let range = list.page_range();
    println!(
        "Showing {}-{} of {} (page {} of {})",
        range.start,
        range.end,
        range.total,
        list.page(),
        list.total_pages()
    );
}

fn project_row(project: &Project) -> String {
    format!(
        "{:>5}  {:<30}  {:<30}  {:>4} assets  {}",
        project.id,
        project.name,
        project.domain(),
        project.assets_count,
        project.creator_name.as_deref().unwrap_or("-")
    )
}

fn asset_row(asset: &Asset) -> String {
    let project = asset.project.as_ref().map(|p| p.name.as_str()).unwrap_or("-");
    format!(
        "{:>5}  {:<30}  {:<6}  {:>9}  {:<12}  {}",
        asset.id,
        asset.display_name(),
        asset.format_label(),
        asset.size_label(),
        asset.detail_label(),
        project
    )
}

fn apply_list_args<T: asset_repo::services::list_state::Searchable>(list: &mut ListState<T>, args: &ListArgs) {
    list.set_query(&args.query);
    list.set_page(args.page);
}

/// Request and validation failures are reported as error notifications and
/// turn into a failing exit code; anything else propagates.
async fn run(cli: Cli) -> Result<ExitCode> {
    if let Command::Route { path } = &cli.command {
        // Guard evaluation only needs the local credential.
        let config = load_config(cli.config.as_deref())?;
        let session = Session::new(Arc::new(CookieCredentialStore::new(config.resolved_cookie_path()?)));
        let route = Route::parse(path);
        match RouteGuard::new(session).check(path) {
            GuardDecision::Pass => println!("{:?}: pass ({:?})", route, route.class()),
            GuardDecision::Redirect(to) => println!("{:?}: redirect to {}", route, to),
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut app = App::new(&cli)?;
    match dispatch(&mut app, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => match e.downcast::<AppError>() {
            Ok(app_error) => {
                app.notifications.error(&app_error);
                app.flush();
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e),
        },
    }
}

async fn dispatch(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password, next } => {
            let user = app.auth().login(&email, &password).await?;
            let name = user.map(|u| u.name).unwrap_or(email);
            app.notify(NotificationKind::Success, &format!("Signed in as {}.", name));
            println!(
                "Continue at {}",
                RouteGuard::post_login_destination(next.as_deref())
            );
        }
        Command::Register {
            name,
            email,
            password,
            password_confirmation,
        } => {
            let request = RegisterRequest {
                name,
                email,
                password_confirmation: password_confirmation.unwrap_or_else(|| password.clone()),
                password,
                company_domain: app.config.company_domain.clone(),
                company_name: app.config.company_name.clone(),
            };
            app.auth().register(&request).await?;
            app.notify(NotificationKind::Success, "Account created.");
        }
        Command::Logout => {
            app.auth().logout().await?;
            app.notify(NotificationKind::Info, "Signed out.");
        }
        Command::Whoami => match app.auth().current_user().await {
            Some(user) => println!("{} <{}>", user.name, user.email),
            None => println!("Not signed in."),
        },
        Command::Stats => {
            let stats = app.api.users.stats().await.map_err(AppError::from)?;
            println!("Projects:        {}", stats.projects_count);
            println!("Assets:          {}", stats.assets_count);
            println!("Member projects: {}", stats.member_projects_count);
        }
        Command::Projects(command) => run_projects(app, command).await?,
        Command::Assets(command) => run_assets(app, command).await?,
        Command::Users(UserCommand::Search { email }) => {
            let search = UserSearch::new(Arc::new(app.api.users.clone()));
            let users = search.search(&email).await.unwrap_or_default();
            if users.is_empty() {
                println!("No users found.");
            }
            for user in users {
                println!("{:>5}  {:<24}  {}", user.id, user.name, user.email);
            }
        }
        Command::Route { .. } => {}
    }
    Ok(())
}

async fn run_projects(app: &mut App, command: ProjectCommand) -> Result<()> {
    let mut service = app.projects();
    match command {
        ProjectCommand::List(args) => {
            service.refresh().await?;
            apply_list_args(service.projects_mut(), &args);
            print_page(service.projects(), project_row);
        }
        ProjectCommand::Show { id } => {
            let Some(form) = service.load_for_edit(id).await? else {
                println!("Project not found.");
                return Ok(());
            };
            let project = form.original();
            println!("{} ({})", project.name, project.domain());
            println!("Website: {}", project.website_url);
            if let Some(creator) = &project.creator_name {
                println!("Created by: {}", creator);
            }
            if let Some(at) = project.last_activity() {
                println!("Last activity: {}", at.format("%Y-%m-%d %H:%M"));
            }
            for field in &form.extra_fields {
                println!("  {} = {}", field.key, field.value);
            }

            let mut assets = app.assets(AssetScope::Project(id));
            assets.refresh().await?;
            let stats = assets.stats();
            println!(
                "Assets: {} ({} images, {} videos)",
                stats.total, stats.images, stats.videos
            );
        }
        ProjectCommand::Create { name, url } => {
            service.create(&name, &url).await?;
            app.notify(NotificationKind::Success, project_service::PROJECT_CREATED);
            print_page(service.projects(), project_row);
        }
        ProjectCommand::Update {
            id,
            name,
            url,
            extra,
            remove_extra,
            add_member,
        } => {
            let Some(mut form) = service.load_for_edit(id).await? else {
                println!("Project not found.");
                return Ok(());
            };
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(url) = url {
                form.website_url = url;
            }
            for (key, value) in &extra {
                form.upsert_field(key, value);
            }
            for key in &remove_extra {
                let normalized = asset_repo::domain::project::normalize_extra_key(key);
                form.extra_fields
                    .retain(|f| asset_repo::domain::project::normalize_extra_key(&f.key) != normalized);
            }
            if let Some(email) = add_member {
                form.add_user_email = email;
            }
            service.update(&form).await?;
            app.notify(NotificationKind::Success, project_service::PROJECT_UPDATED);
        }
        ProjectCommand::Delete { id } => {
            service.delete(id).await?;
            app.notify(NotificationKind::Success, project_service::PROJECT_DELETED);
        }
    }
    Ok(())
}

async fn run_assets(app: &mut App, command: AssetCommand) -> Result<()> {
    match command {
        AssetCommand::List { project, list } => {
            let mut service = app.assets(AssetScope::Project(project));
            service.refresh().await?;
            apply_list_args(service.assets_mut(), &list);
            print_page(service.assets(), asset_row);
        }
        AssetCommand::Mine(list) => {
            let mut service = app.assets(AssetScope::Mine);
            service.refresh().await?;
            apply_list_args(service.assets_mut(), &list);
            print_page(service.assets(), asset_row);
        }
        AssetCommand::Show { id } => {
            let service = app.assets(AssetScope::Mine);
            let Some(asset) = service.find(id).await? else {
                println!("Asset not found.");
                return Ok(());
            };
            println!("{}", asset.display_name());
            println!("Format:  {}", asset.format_label());
            println!("Size:    {}", asset.size_label());
            println!("Detail:  {}", asset.detail_label());
            println!("Kind:    {}", if asset.is_video() { "video" } else { "image" });
            println!("URL:     {}", asset.url);
            println!("Preview: {}", asset.preview_url());
            if let Some(project) = &asset.project {
                println!("Project: {} ({})", project.name, project.domain());
            }
        }
        AssetCommand::Upload { project, files } => {
            let mut batch = Vec::with_capacity(files.len());
            for path in &files {
                let file = UploadFile::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                batch.push(file);
            }
            let mut service = app.assets(AssetScope::Project(project));
            let summary = service.upload(batch, &ProgressLine).await?;
            app.notifications.success(summary.message);
            if let Some(e) = &summary.refresh_error {
                app.notifications.push(
                    NotificationKind::Warning,
                    format!("Could not refresh the asset list: {}", e.user_message()),
                );
            }
            app.flush();
        }
        AssetCommand::Delete { id } => {
            let mut service = app.assets(AssetScope::Mine);
            service.delete(id).await?;
            app.notify(NotificationKind::Success, asset_service::ASSET_DELETED);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

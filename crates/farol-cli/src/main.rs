use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use farol_client::HttpAuthority;
use farol_config::{find_config_path, load_config, Config};
use farol_core::draft::ApiDraft;
use farol_core::headers;
use farol_core::schedule::{compile, expand_interval, Day, ScheduleMap, TimeOfDay};
use farol_core::state::{Method, MonitoredApi, ServiceState};
use farol_core::store::StatusStore;
use farol_core::sync::{Connectivity, RemoteAuthority, SyncEngine};

#[derive(Parser)]
#[command(name = "farol", about = "API monitoring dashboard companion", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current service state once and print a summary
    Status,
    /// Keep polling the backend until Ctrl-C
    Watch,
    /// Toggle WhatsApp message sending
    ToggleMessages,
    /// Manage monitored APIs
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
    /// Notification channel helpers
    Notify {
        #[command(subcommand)]
        action: NotifyCommands,
    },
    /// List schedule groups known to the backend
    Groups,
    /// Work with weekly schedules without saving anything
    Schedule {
        #[command(subcommand)]
        action: ScheduleCommands,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// List monitored APIs
    List,
    /// Create or update a monitored API
    Add {
        /// Id to update (a new id is generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        /// HTTP method: GET, POST, PUT, DELETE or PATCH
        #[arg(long, default_value = "GET")]
        method: String,
        #[arg(long)]
        url: String,
        /// Request body (JSON)
        #[arg(long)]
        body: Option<String>,
        /// Extra header as key=value (repeatable)
        #[arg(long = "header")]
        headers: Vec<String>,
        /// Basic auth credentials as user:password
        #[arg(long)]
        basic_auth: Option<String>,
        /// Schedule group id
        #[arg(long)]
        group: Option<String>,
        /// Calendar slot as day@HH:MM, day 0-6 with 0 = Sunday (repeatable)
        #[arg(long = "slot")]
        slots: Vec<String>,
        /// Interval start time (HH:MM)
        #[arg(long)]
        from: Option<String>,
        /// Interval end time (HH:MM)
        #[arg(long)]
        to: Option<String>,
        /// Interval step in minutes
        #[arg(long)]
        every: Option<u32>,
        /// Interval day 0-6 (repeatable; default Monday-Friday)
        #[arg(long = "day")]
        days: Vec<u8>,
        /// Hand-typed cron field; overrides the calendar
        #[arg(long)]
        cron: Option<String>,
        /// Create the API disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Delete a monitored API by id
    Delete { id: String },
    /// Trigger a one-shot probe for an API
    Test { id: String },
}

#[derive(Subcommand)]
enum NotifyCommands {
    /// Send a test message through the channel
    Test {
        #[arg(
            long,
            default_value = "🚀 Teste de envio WhatsApp realizado via dashboard!"
        )]
        message: String,
    },
    /// Send the offline-routes digest
    Offline,
}

#[derive(Subcommand)]
enum ScheduleCommands {
    /// Expand an interval description into a calendar and its cron lines
    Preview {
        #[arg(long, default_value = "09:00")]
        from: String,
        #[arg(long, default_value = "17:00")]
        to: String,
        #[arg(long, default_value_t = 30)]
        every: u32,
        /// Day 0-6 (repeatable; default Monday-Friday)
        #[arg(long = "day")]
        days: Vec<u8>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(find_config_path);
    let config = load_config(&config_path)?;

    // Pure schedule tooling needs no engine
    if let Commands::Schedule { action } = cli.command {
        return run_schedule_command(action);
    }

    let mut engine = build_engine(&config)?;

    match cli.command {
        Commands::Status => {
            engine.poll().await;
            print_banner(&engine);
            print_state(&engine.store().snapshot());
        }
        Commands::Watch => {
            engine.start(Duration::from_secs(config.backend.poll_interval_secs));
            tracing::info!(
                "Watching {} every {}s. Press Ctrl-C to stop.",
                config.backend.base_url,
                config.backend.poll_interval_secs
            );
            tokio::signal::ctrl_c().await?;
            engine.stop();
        }
        Commands::ToggleMessages => {
            engine.poll().await;
            engine.toggle_notifications().await;
            let enabled = engine.store().snapshot().is_message_sending_enabled;
            println!(
                "Envio de mensagens: {}",
                if enabled { "Ativo" } else { "Inativo" }
            );
        }
        Commands::Api { action } => run_api_command(action, &config, &engine).await?,
        Commands::Notify { action } => run_notify_command(action, &engine).await,
        Commands::Groups => {
            let groups = engine.list_schedule_groups().await;
            if groups.is_empty() {
                println!("Nenhum grupo de agendamento.");
            } else {
                for group in groups {
                    println!("{}  {}", group.id, group.name);
                }
            }
        }
        Commands::Schedule { .. } => unreachable!(),
    }

    Ok(())
}

fn build_engine(config: &Config) -> Result<SyncEngine> {
    let store = Arc::new(StatusStore::default());
    let remote: Arc<dyn RemoteAuthority> = Arc::new(HttpAuthority::new(
        &config.backend.base_url,
        Duration::from_secs(config.backend.request_timeout_secs),
    )?);
    Ok(SyncEngine::new(
        store,
        remote,
        Duration::from_secs(config.backend.test_resync_delay_secs),
    ))
}

async fn run_api_command(action: ApiCommands, config: &Config, engine: &SyncEngine) -> Result<()> {
    match action {
        ApiCommands::List => {
            engine.poll().await;
            print_banner(engine);
            for api in &engine.store().snapshot().apis {
                print_api(api);
            }
        }
        ApiCommands::Add {
            id,
            name,
            method,
            url,
            body,
            headers: extra_headers,
            basic_auth,
            group,
            slots,
            from,
            to,
            every,
            days,
            cron,
            disabled,
        } => {
            let mut draft = ApiDraft::default();
            draft.name = name;
            draft.method = Method::parse(&method)
                .ok_or_else(|| anyhow::anyhow!("unknown HTTP method '{method}'"))?;
            draft.url = url;
            draft.body = body.unwrap_or_default();
            draft.enabled = !disabled;
            draft.schedule_group_id = group;
            draft.cron_override = cron;

            if !config.editor.seed_default_headers {
                draft.headers.clear();
            }
            for header in &extra_headers {
                let (key, value) = header
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("header must be key=value, got '{header}'"))?;
                draft
                    .headers
                    .push(headers::HeaderEntry::new(key, value, true));
            }
            if let Some(credentials) = &basic_auth {
                let (user, pass) = credentials.split_once(':').ok_or_else(|| {
                    anyhow::anyhow!("basic auth must be user:password")
                })?;
                headers::apply_basic_auth(&mut draft.headers, user, pass);
            }

            if let Some(calendar) = build_calendar(&slots, &from, &to, every, &days)? {
                draft.schedule = calendar;
            }

            let updating = id.is_some();
            let api = draft.into_api(id)?;
            println!("Agendamento ({}):", api.id);
            for line in api.cron.split(';').filter(|l| !l.is_empty()) {
                println!("  {line}");
            }

            engine.poll().await;
            engine.save_api(api).await;
            print_banner(engine);
            println!(
                "API {}.",
                if updating { "atualizada" } else { "salva" }
            );
        }
        ApiCommands::Delete { id } => {
            engine.poll().await;
            engine.delete_api(&id).await;
            print_banner(engine);
            println!("API removida.");
        }
        ApiCommands::Test { id } => {
            engine.poll().await;
            engine.test_api(&id).await;
            print_banner(engine);
            match engine.store().snapshot().apis.iter().find(|a| a.id == id) {
                Some(api) => print_api(api),
                None => println!("Nenhuma API com id '{id}'."),
            }
        }
    }
    Ok(())
}

async fn run_notify_command(action: NotifyCommands, engine: &SyncEngine) {
    match action {
        NotifyCommands::Test { message } => match engine.send_test_message(&message).await {
            Ok(outcome) if outcome.ok => {
                println!("Mensagem de teste enviada com sucesso!");
            }
            Ok(_) => println!("Falha ao enviar mensagem de teste."),
            Err(e) => println!("Erro ao enviar mensagem de teste: {e}"),
        },
        NotifyCommands::Offline => match engine.send_offline_digest().await {
            Ok(outcome) if outcome.ok && outcome.sent => {
                println!("Mensagem de rotas offline enviada com sucesso!");
            }
            Ok(outcome) => println!(
                "{}",
                outcome
                    .message
                    .unwrap_or_else(|| "Nenhuma rota offline para enviar.".into())
            ),
            Err(e) => println!("Erro ao enviar mensagem de rotas offline: {e}"),
        },
    }
}

fn run_schedule_command(action: ScheduleCommands) -> Result<()> {
    match action {
        ScheduleCommands::Preview {
            from,
            to,
            every,
            days,
        } => {
            let start: TimeOfDay = from.parse()?;
            let end: TimeOfDay = to.parse()?;
            let days = parse_days(&days)?;
            let schedule = expand_interval(&start, &end, every, &days)?;

            for (day, times) in schedule.iter() {
                let formatted: Vec<&str> = times.iter().map(TimeOfDay::as_str).collect();
                println!("{:<8} {}", day.name(), formatted.join(" "));
            }
            println!(
                "\n{} execuções por semana. Expressões cron:",
                schedule.total_slots()
            );
            for line in compile(&schedule) {
                println!("  {line}");
            }
        }
    }
    Ok(())
}

/// Assemble the calendar from explicit slots and/or an interval description.
/// Returns `None` when neither was given so the draft keeps its default.
fn build_calendar(
    slots: &[String],
    from: &Option<String>,
    to: &Option<String>,
    every: Option<u32>,
    days: &[u8],
) -> Result<Option<ScheduleMap>> {
    let mut schedule = ScheduleMap::new();
    let mut built = false;

    for slot in slots {
        let (day, time) = slot
            .split_once('@')
            .ok_or_else(|| anyhow::anyhow!("slot must be day@HH:MM, got '{slot}'"))?;
        let day = Day::try_from(day.parse::<u8>()?)?;
        schedule.insert_slot(day, time.parse()?);
        built = true;
    }

    if let (Some(from), Some(to), Some(every)) = (from, to, every) {
        let start: TimeOfDay = from.parse()?;
        let end: TimeOfDay = to.parse()?;
        let interval = expand_interval(&start, &end, every, &parse_days(days)?)?;
        schedule.merge(interval);
        built = true;
    }

    Ok(built.then_some(schedule))
}

fn parse_days(days: &[u8]) -> Result<Vec<Day>> {
    if days.is_empty() {
        return Ok(Day::WEEKDAYS.to_vec());
    }
    days.iter()
        .map(|&d| Day::try_from(d).map_err(Into::into))
        .collect()
}

fn print_banner(engine: &SyncEngine) {
    match engine.connectivity() {
        Connectivity::Connected => println!("● Conectado"),
        Connectivity::Fallback => {
            println!("◌ Modo Demo");
            if let Some(error) = engine.connection_error() {
                println!("  {error}");
            }
        }
    }
}

fn print_state(state: &ServiceState) {
    println!("Última verificação:  {}", state.last_run_timestamp);
    println!("Próxima verificação: {}", state.next_run_timestamp);
    println!("Status: {}", state.last_run_status);
    println!(
        "WhatsApp: {}",
        if state.is_message_sending_enabled {
            "Ativo"
        } else {
            "Inativo"
        }
    );
    if !state.last_failed_apis.is_empty() {
        println!("Falhas na última execução: {}", state.last_failed_apis.join(", "));
    }
    println!("\nAPIs monitoradas:");
    for api in &state.apis {
        print_api(api);
    }
}

fn print_api(api: &MonitoredApi) {
    let status = match api.is_online {
        Some(true) => "Online",
        Some(false) => "Offline",
        None => "—",
    };
    println!(
        "  [{}] {} ({})  {}  {}",
        api.method,
        api.name,
        api.id,
        api.url,
        if api.enabled { status } else { "Desabilitada" }
    );
    if let Some(last_run) = &api.last_run {
        let latency = api
            .response_time
            .map(|ms| format!(" ({ms}ms)"))
            .unwrap_or_default();
        println!("        última execução: {last_run}{latency}");
    }
    if !api.cron.is_empty() {
        println!("        cron: {}", api.cron);
    }
}

use clap::Parser;
use ownly_client::config::{Command, StreamsAction};
use ownly_client::core::{catalog, export, summary};
use ownly_client::domain::model::{GenerateRequest, GenerateResponse, StreamSnapshot};
use ownly_client::domain::ports::ConfigProvider;
use ownly_client::utils::error::ErrorSeverity;
use ownly_client::utils::logger;
use ownly_client::{
    connect_with, CliConfig, ClientConfig, CreateDatasetSession, LocalStorage, MarketplaceApi,
    MarketplaceError, Result, StreamPoller, StreamRegistry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI args: {:?}", cli);

    let needs_key = cli.command.needs_api_key();
    let config = match cli
        .resolve()
        .and_then(|config| config.validate_for(needs_key).map(|_| config))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?}, Retryable: {})",
            e,
            e.category(),
            e.severity(),
            e.is_retryable()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(command: Command, config: ClientConfig) -> Result<()> {
    let api = connect_with(&config, command.needs_api_key())?;

    match command {
        Command::Health => {
            let health = api.health().await?;
            println!("ok: {}, demo: {}", health.ok, health.demo);
        }
        Command::Catalog { search, category } => {
            let datasets = api.fetch_catalog().await?.datasets;
            let mut matches = catalog::search(&datasets, search.as_deref().unwrap_or(""));
            if let Some(category) = category {
                let in_category = catalog::filter_by_category(&datasets, &category);
                matches.retain(|d| in_category.iter().any(|c| c.id == d.id));
            }
            if matches.is_empty() {
                println!("No datasets found");
            }
            for dataset in matches {
                println!(
                    "{}  {} [{}] {} users, ${}/user/day, {}",
                    dataset.id,
                    dataset.title,
                    dataset
                        .domains
                        .iter()
                        .map(|d| summary::title_case(d))
                        .collect::<Vec<_>>()
                        .join(", "),
                    summary::format_count(dataset.est_users),
                    dataset.pricing_per_user_day,
                    dataset.freshness
                );
            }
        }
        Command::Plan { query } => {
            let mut session = CreateDatasetSession::new(api);
            session.set_query(query);
            if session.submit().await? {
                print_results(&session);
            }
        }
        Command::Create {
            query,
            select,
            select_all,
            preview,
            generate,
            dataset_id,
        } => {
            let mut session = CreateDatasetSession::new(api);
            session.set_query(query);
            if !session.submit().await? {
                return Ok(());
            }

            for source_id in &select_all {
                session.selection_mut().select_all(source_id);
            }
            for spec in &select {
                let (source_id, field) = parse_selection(spec)?;
                if !session.toggle_field(source_id, field) {
                    tracing::warn!("⚠️ {} is not selected (unknown or toggled off)", spec);
                }
            }
            print_results(&session);

            if preview {
                let rows = session.preview(&dataset_id).await?;
                println!("\nData preview ({} sample rows)", rows.len());
                println!("{}", summary::render_rows(rows));
            }
            if generate {
                let response = session.generate(&dataset_id).await?;
                println!("\n✅ Stream {} is ready", response.dataset_id);
                println!("📡 Endpoint: {}", response.endpoint);
                println!(
                    "{} active consents, ~{} users, updates every {}",
                    response.active_consents,
                    summary::format_count(response.est_users),
                    response.updates_every
                );
                println!("{}", summary::render_rows(&response.sample));
                remember_stream(&config, &dataset_id, response).await?;
            }
        }
        Command::Generate {
            dataset_id,
            sources,
        } => {
            let request = GenerateRequest {
                dataset_id,
                selected_sources: sources,
                selected_fields: Default::default(),
            };
            let response = api.generate_dataset(&request).await?;
            println!("✅ Stream {} is ready", response.dataset_id);
            println!("📡 Endpoint: {}", response.endpoint);
            remember_stream(&config, &request.dataset_id, &response).await?;
        }
        Command::Streams { action } => {
            manage_streams(api, &config, action.unwrap_or(StreamsAction::List)).await?;
        }
        Command::Stream {
            id,
            follow,
            limit,
            export,
        } => {
            let latest = if follow {
                follow_stream(api, &id, &config, limit).await?
            } else {
                let snapshot = api.get_stream(&id).await?;
                print_snapshot(&snapshot);
                Some(snapshot)
            };

            if export {
                match latest {
                    Some(snapshot) => {
                        let storage = LocalStorage::new(config.output_path().to_string());
                        let path = export::export_stream_csv(&storage, &snapshot).await?;
                        println!("📁 Rows saved to: {}", path);
                    }
                    None => tracing::warn!("⚠️ Nothing to export for stream {}", id),
                }
            }
        }
        Command::ApiKey => {
            let key = api.create_api_key().await?;
            println!("{}", key.api_key);
            if let Some(note) = key.note {
                println!("({})", note);
            }
        }
    }

    Ok(())
}

fn registry_storage(config: &ClientConfig) -> LocalStorage {
    LocalStorage::new(config.output_path().to_string())
}

async fn remember_stream(
    config: &ClientConfig,
    dataset_id: &str,
    response: &GenerateResponse,
) -> Result<()> {
    let storage = registry_storage(config);
    let mut registry = StreamRegistry::load(&storage).await?;
    registry.record(dataset_id, response);
    let path = registry.save(&storage).await?;
    tracing::debug!("Stream registry saved to {}", path);
    Ok(())
}

async fn manage_streams(
    api: Arc<dyn MarketplaceApi>,
    config: &ClientConfig,
    action: StreamsAction,
) -> Result<()> {
    let storage = registry_storage(config);
    let mut registry = StreamRegistry::load(&storage).await?;

    match action {
        StreamsAction::List => {
            println!("{}", summary::render_stream_list(registry.records()));
            return Ok(());
        }
        StreamsAction::Refresh { id: Some(id) } => {
            let record = registry.refresh(api.as_ref(), &id).await?;
            println!("{}", summary::render_stream_list(std::slice::from_ref(record)));
        }
        StreamsAction::Refresh { id: None } => {
            registry.refresh_all(api.as_ref()).await?;
            println!("{}", summary::render_stream_list(registry.records()));
        }
        StreamsAction::Remove { id } => {
            let record = registry.remove(&id).ok_or_else(|| not_in_registry(&id))?;
            println!("🗑️ Removed stream {}", record.id);
        }
        StreamsAction::Pause { id } => {
            if !registry.set_paused(&id, true) {
                return Err(not_in_registry(&id));
            }
            println!("⏸️ Stream {} paused", id);
        }
        StreamsAction::Resume { id } => {
            if !registry.set_paused(&id, false) {
                return Err(not_in_registry(&id));
            }
            println!("▶️ Stream {} active", id);
        }
    }

    registry.save(&storage).await?;
    Ok(())
}

fn not_in_registry(id: &str) -> MarketplaceError {
    MarketplaceError::NotFound {
        resource: format!("stream '{}' in the local registry", id),
    }
}

fn parse_selection(spec: &str) -> Result<(&str, &str)> {
    spec.split_once(':')
        .filter(|(source, field)| !source.is_empty() && !field.is_empty())
        .ok_or_else(|| MarketplaceError::InvalidConfigValueError {
            field: "--select".to_string(),
            value: spec.to_string(),
            reason: "Expected SOURCE:FIELD".to_string(),
        })
}

fn print_results(session: &CreateDatasetSession) {
    let Some(plan) = session.plan() else {
        return;
    };
    println!(
        "Detected domains: {}",
        plan.detected_domains
            .iter()
            .map(|d| summary::title_case(d))
            .collect::<Vec<_>>()
            .join(", ")
    );
    for group in plan.grouped_by_domain() {
        println!("\n{}", summary::render_domain_group(session.selection(), &group));
    }
    println!(
        "\n{}",
        summary::render_selection_summary(session.selection(), session.estimated_users())
    );
}

fn print_snapshot(snapshot: &StreamSnapshot) {
    if let Some(endpoint) = &snapshot.endpoint {
        println!("📡 {}", endpoint);
    }
    println!("{}", summary::render_rows(&snapshot.rows));
}

/// Polls until interrupted or `limit` refreshes have been printed.
async fn follow_stream(
    api: Arc<dyn MarketplaceApi>,
    stream_id: &str,
    config: &ClientConfig,
    limit: Option<u64>,
) -> Result<Option<StreamSnapshot>> {
    let poller = StreamPoller::spawn(api, stream_id, config.poll_interval());
    let mut updates = poller.subscribe();
    let mut printed = 0u64;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                match (&state.latest, &state.last_error) {
                    (_, Some(error)) => eprintln!("⚠️ Refresh failed, showing last data: {}", error),
                    (Some(update), None) => {
                        println!("\nLast updated: {}", update.received_at.format("%H:%M:%S"));
                        print_snapshot(&update.snapshot);
                    }
                    (None, None) => {}
                }
                printed += 1;
                if limit.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
        }
    }

    let state = poller.state();
    poller.stop();
    Ok(state.latest.map(|update| update.snapshot))
}

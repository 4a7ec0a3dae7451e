use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use entigen::codegen::{AnnotationStyle, GenerationReport, GenerationRequest};
use entigen::config::DbConfig;

#[derive(Debug, Clone, ValueEnum)]
enum Database {
    Postgres,
    Mysql,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum CliAnnotationStyle {
    /// PHP 8 attributes
    #[default]
    Attribute,
    /// Docblock annotations
    Docblock,
}

impl From<CliAnnotationStyle> for AnnotationStyle {
    fn from(style: CliAnnotationStyle) -> Self {
        match style {
            CliAnnotationStyle::Attribute => AnnotationStyle::Attribute,
            CliAnnotationStyle::Docblock => AnnotationStyle::Docblock,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "entigen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Target database type
    database: Database,

    /// Directory for entity classes
    #[arg(long, default_value = "./src/Entity")]
    entity_dir: PathBuf,

    /// Directory for repository classes
    #[arg(long, default_value = "./src/Repository")]
    repository_dir: PathBuf,

    /// Namespace of entity classes (default: App\Entity)
    #[arg(long, default_value = "")]
    entity_namespace: String,

    /// Namespace of repository classes (default: App\Repository)
    #[arg(long, default_value = "")]
    repository_namespace: String,

    /// Mapping style
    #[arg(long, value_enum, default_value_t = CliAnnotationStyle::Attribute)]
    style: CliAnnotationStyle,

    /// Comma-separated list of tables to generate (default: all)
    #[arg(long, default_value = "")]
    tables: String,

    /// Comma-separated list of tables to skip
    #[arg(long, default_value = "")]
    exclude: String,

    /// Table name prefix to strip from class names
    #[arg(long, default_value = "")]
    prefix: String,

    /// PostgreSQL schema to introspect
    #[arg(long, default_value = "public")]
    schema: String,

    /// Path to .env file for connection config
    #[arg(long, default_value = "./.env")]
    env_file: PathBuf,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    if let Err(e) = run() {
        error!(error = ?e, "Fatal error");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("entigen v{}", env!("CARGO_PKG_VERSION"));
    info!(
        database = ?cli.database,
        entity_dir = ?cli.entity_dir,
        repository_dir = ?cli.repository_dir,
        style = ?cli.style,
        "Starting code generation"
    );

    // Load configuration
    let config = DbConfig::load(&cli.env_file).context("Failed to load database configuration")?;
    debug!(connection = ?config.redacted_connection_string(), "Loaded configuration");

    let request = GenerationRequest::new(cli.entity_dir, cli.repository_dir)
        .with_entity_namespace(cli.entity_namespace)
        .with_repository_namespace(cli.repository_namespace)
        .with_style(cli.style.into())
        .with_table_list(cli.tables)
        .with_exclude_list(cli.exclude)
        .with_table_prefix(cli.prefix);
    debug!(request = ?request, "Generation request");

    let report = match cli.database {
        Database::Postgres => generate_postgres(&config, &cli.schema, request)?,
        Database::Mysql => generate_mysql(&config, request)?,
    };

    summarize(&report);

    if !report.is_success() {
        bail!(
            "{} of {} tables failed",
            report.failed.len(),
            report.failed.len() + report.generated.len()
        );
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn summarize(report: &GenerationReport) {
    for table in &report.generated {
        info!(
            table = ?table.table,
            class_name = ?table.class_name,
            entity = ?table.entity,
            repository = ?table.repository,
            "Generated"
        );
    }
    for failure in &report.failed {
        error!(table = ?failure.table, error = %failure.error, "Failed");
    }
    info!(
        generated = report.generated.len(),
        failed = report.failed.len(),
        "Summary"
    );
}

#[cfg(feature = "postgres")]
fn generate_postgres(
    config: &DbConfig,
    schema_name: &str,
    request: GenerationRequest,
) -> Result<GenerationReport> {
    use entigen::codegen::Generator;
    use entigen::PostgresInspector;
    use postgres::NoTls;

    info!(connection = ?config.redacted_connection_string(), "Connecting to PostgreSQL");

    let mut client = postgres::Client::connect(&config.postgres_connection_string(), NoTls)
        .with_context(|| {
            format!(
                "Failed to connect to PostgreSQL at {}",
                config.redacted_connection_string()
            )
        })?;

    info!("Connected to database");

    let inspector = PostgresInspector::new(&mut client, schema_name);
    let mut generator = Generator::new(request.with_database(schema_name), inspector);
    let report = generator.run().context("Code generation failed")?;

    Ok(report)
}

#[cfg(not(feature = "postgres"))]
fn generate_postgres(
    _config: &DbConfig,
    _schema_name: &str,
    _request: GenerationRequest,
) -> Result<GenerationReport> {
    bail!("PostgreSQL support not enabled. Rebuild with --features postgres")
}

#[cfg(feature = "mysql")]
fn generate_mysql(config: &DbConfig, request: GenerationRequest) -> Result<GenerationReport> {
    use entigen::codegen::Generator;
    use entigen::config::MYSQL_DEFAULT_PORT;
    use entigen::MySqlInspector;

    info!(connection = ?config.redacted_connection_string(), "Connecting to MySQL");

    let opts = mysql::OptsBuilder::new()
        .ip_or_hostname(Some(config.host.as_str()))
        .tcp_port(config.port_or(MYSQL_DEFAULT_PORT))
        .user(Some(config.user.as_str()))
        .pass(Some(config.password.as_str()))
        .db_name(Some(config.database.as_str()));
    let mut conn = mysql::Conn::new(opts).with_context(|| {
        format!(
            "Failed to connect to MySQL at {}",
            config.redacted_connection_string()
        )
    })?;

    info!("Connected to database");

    let inspector = MySqlInspector::new(&mut conn, config.database.clone());
    let mut generator = Generator::new(request.with_database(config.database.clone()), inspector);
    let report = generator.run().context("Code generation failed")?;

    Ok(report)
}

#[cfg(not(feature = "mysql"))]
fn generate_mysql(_config: &DbConfig, _request: GenerationRequest) -> Result<GenerationReport> {
    bail!("MySQL support not enabled. Rebuild with --features mysql")
}

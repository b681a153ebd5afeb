use clap::Parser;
use kit_compliance::config::Command;
use kit_compliance::core::register::RegisterFilter;
use kit_compliance::core::status::classify_date;
use kit_compliance::core::{Clock, NewServiceRecord, RegisterEntry};
use kit_compliance::utils::error::ErrorSeverity;
use kit_compliance::utils::{logger, validation::Validate};
use kit_compliance::{
    classify, compute_retest_date, latest_per_serial, AppConfig, CliConfig, ComplianceError,
    ComplianceRegister, Directory, FixedClock, RestBackend, SystemClock,
};
use serde_json::{Map, Value};

enum AnyClock {
    System(SystemClock),
    Fixed(FixedClock),
}

impl Clock for AnyClock {
    fn today(&self) -> chrono::NaiveDate {
        match self {
            AnyClock::System(clock) => clock.today(),
            AnyClock::Fixed(clock) => clock.today(),
        }
    }
}

fn load_config(path: &str) -> kit_compliance::Result<AppConfig> {
    tracing::debug!("Loading configuration from {}", path);
    let config = AppConfig::from_file(path)?;
    config.validate()?;
    Ok(config)
}

fn require_admin(config: &AppConfig, user: Option<&str>) -> kit_compliance::Result<()> {
    match user {
        Some(email) if config.is_admin(email) => Ok(()),
        None if config.admin.emails.is_empty() => Ok(()),
        _ => Err(ComplianceError::ValidationError {
            message: "only administrators may record inspections (pass --user)".to_string(),
        }),
    }
}

fn print_entries(config: &AppConfig, entries: &[RegisterEntry]) {
    println!(
        "{:<18} {:<24} {:<12} {:<12} {:<10} {:<8}",
        "SERIAL", "CERTIFICATE", "TESTED", "RETEST", "STATUS", "COLOUR"
    );
    for entry in entries {
        let record = &entry.record;
        println!(
            "{:<18} {:<24} {:<12} {:<12} {:<10} {:<8}",
            record.equipment_serial,
            record.certificate_number.as_deref().unwrap_or("-"),
            record.test_date,
            record.retest_date,
            entry.classification.status,
            config.theme.color_for(entry.classification.color),
        );
    }
}

async fn run(cli: CliConfig) -> kit_compliance::Result<()> {
    let clock = match cli.today {
        Some(date) => AnyClock::Fixed(FixedClock(date)),
        None => AnyClock::System(SystemClock),
    };

    match cli.command {
        Command::Retest { test_date } => {
            println!("{}", compute_retest_date(&test_date)?);
        }
        Command::Status { retest_date } => {
            let classification = classify(&retest_date, clock.today())?;
            println!("{} ({:?})", classification.status, classification.color);
        }
        Command::Latest { csv } => {
            let records = kit_compliance::adapters::csv_import::load_records_csv_file(&csv)?;
            let total = records.len();
            let latest = latest_per_serial(records);
            tracing::info!("📋 {} records reduced to {} serials", total, latest.len());
            let today = clock.today();
            for (serial, record) in latest {
                let classification = classify_date(record.retest_date, today);
                println!(
                    "{}\t{}\t{}\t{}",
                    serial, record.test_date, record.retest_date, classification.status
                );
            }
        }
        Command::Engineers => {
            let config = load_config(&cli.config)?;
            for engineer in &config.engineers {
                match &engineer.signature_label {
                    Some(label) => println!("{}\t{}", engineer.name, label),
                    None => println!("{}", engineer.name),
                }
            }
        }
        Command::Companies => {
            let config = load_config(&cli.config)?;
            let directory = Directory::new(RestBackend::new(&config)?);
            for company in directory.list_companies().await? {
                println!(
                    "{}\t{}\t{}",
                    company.id,
                    company.name,
                    company.contact_email.as_deref().unwrap_or("-")
                );
            }
        }
        command => {
            let config = load_config(&cli.config)?;
            let register =
                ComplianceRegister::new(RestBackend::new(&config)?, clock, config.numbering()?)
                    .with_max_insert_attempts(config.max_insert_attempts());

            match command {
                Command::Register {
                    kind,
                    company,
                    status,
                    search,
                    sort,
                } => {
                    let filter = RegisterFilter {
                        company_id: company,
                        status,
                        search,
                        sort,
                    };
                    let entries = register.register(kind, &filter).await?;
                    tracing::info!("📋 {} {} entries", entries.len(), kind.label());
                    print_entries(&config, &entries);
                }
                Command::Summary { kind, company } => {
                    let summary = register.summary(kind, company.as_deref()).await?;
                    println!(
                        "{}: {} valid, {} upcoming, {} expired ({} total)",
                        kind.label(),
                        summary.valid,
                        summary.upcoming,
                        summary.expired,
                        summary.total()
                    );
                }
                Command::History { kind, serial } => {
                    for record in register.history(kind, &serial).await? {
                        println!(
                            "{}\t{}\t{}\t{}",
                            record.certificate_number.as_deref().unwrap_or("-"),
                            record.test_date,
                            record.retest_date,
                            record.engineer_name.as_deref().unwrap_or("-")
                        );
                    }
                }
                Command::NextCert { kind } => {
                    require_admin(&config, cli.user.as_deref())?;
                    println!("{}", register.next_certificate_number(kind).await?);
                }
                Command::Record {
                    kind,
                    serial,
                    test_date,
                    company,
                    name,
                    engineer,
                    result,
                    notes,
                    fields,
                } => {
                    require_admin(&config, cli.user.as_deref())?;

                    let engineer_name = match engineer {
                        Some(name) if !config.engineers.is_empty() => {
                            let known = config.engineer(&name).ok_or_else(|| {
                                ComplianceError::ValidationError {
                                    message: format!("'{}' is not a configured engineer", name),
                                }
                            })?;
                            Some(known.name.clone())
                        }
                        other => other,
                    };

                    let details: Map<String, Value> = fields
                        .into_iter()
                        .map(|(key, value)| (key, Value::String(value)))
                        .collect();

                    let record = register
                        .create_service_record(
                            kind,
                            NewServiceRecord {
                                company_id: company,
                                equipment_serial: serial,
                                equipment_name: name,
                                test_date,
                                engineer_name,
                                result,
                                notes,
                                details,
                            },
                        )
                        .await?;

                    println!(
                        "✅ {} issued, retest due {}",
                        record.certificate_number.as_deref().unwrap_or("-"),
                        record.retest_date
                    );
                }
                Command::Retest { .. }
                | Command::Status { .. }
                | Command::Latest { .. }
                | Command::Engineers
                | Command::Companies => unreachable!("handled above"),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
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

mod demo;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tabwatch_core::config::{Command, Config, ConfigAction, PolicyUpdate, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.normalize();

    match cli.command {
        Command::Demo {
            scenario,
            hidden,
            alert,
        } => {
            if let Some(alert) = alert {
                settings.alert_option = alert;
            }
            let report = demo::run(&settings, scenario, hidden).await?;

            println!("final state:   {}", report.state);
            println!("retry clicks:  {}", report.clicks);
            println!("banners shown: {}", report.banners_shown);
            let trail: Vec<&str> = report.favicons.iter().map(|f| f.name()).collect();
            println!("favicons:      {}", trail.join(" -> "));
            match report.focused_tab {
                Some(tab_id) => println!("focused tab:   {}", tab_id),
                None => println!("focused tab:   -"),
            }
            println!("notifications: {}", report.notifications.len());
            for message in &report.notifications {
                println!("  {}", message.replace('\n', " | "));
            }
        }
        Command::Config {
            action: ConfigAction::Show,
        } => {
            let rendered =
                toml::to_string_pretty(&settings).context("Failed to render settings")?;
            print!("{}", rendered);
        }
        Command::Config {
            action:
                ConfigAction::Set {
                    min_delay,
                    max_delay,
                    alert,
                },
        } => {
            let update = PolicyUpdate {
                min_delay_secs: min_delay,
                max_delay_secs: max_delay,
                alert_option: alert,
            };
            let path = Settings::save_path(cli.config.as_ref())
                .context("No config directory available")?;
            let saved = settings.save_policy(&path, &update)?;
            println!(
                "Saved to {}: delay {}-{}s, alert {}",
                path.display(),
                saved.retry.min_delay_secs,
                saved.retry.max_delay_secs,
                saved.alert_option
            );
        }
    }

    Ok(())
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("tabwatch=debug,tabwatch_core=debug")
    } else {
        EnvFilter::new("tabwatch=info,tabwatch_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

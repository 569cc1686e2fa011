//! dash-runner: headless shell for the FinGuard dashboard data layer.
//!
//! Usage:
//!   dash-runner --seed 7 --customers 24 --db demo.db
//!   dash-runner --seed 7 --ipc-mode

mod seed;

use anyhow::Result;
use chrono::Utc;
use finguard_core::{
    auth::{AuthFlow, LocalAuthProvider},
    chat::{ChatMessage, ChatSession, HttpChatTransport},
    config::HubConfig,
    dashboard::{Dashboard, DashboardState},
    hub::LiveHub,
    path::DocPath,
    session::Session,
    store::{AckOutcome, DocumentStore},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    SignIn {
        email: String,
        password: String,
    },
    SignOut,
    Acknowledge {
        alert_id: String,
    },
    Chat {
        message: String,
    },
    /// Stand-in for a backend job writing a document.
    Write {
        path: String,
        data: serde_json::Value,
    },
    /// Run the institution metrics roll-up now.
    RefreshMetrics {
        institution_id: String,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    session:   Option<Session>,
    dashboard: Option<DashboardState>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chat:      Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ack:       Option<AckOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:     Option<String>,
}

struct Shell {
    hub:       LiveHub,
    auth:      LocalAuthProvider,
    transport: HttpChatTransport,
    dashboard: Option<Dashboard>,
    chat:      ChatSession,
}

impl Shell {
    fn new(hub: LiveHub, auth: LocalAuthProvider) -> Self {
        let transport = HttpChatTransport::new(&hub.config().chat_endpoint);
        Self { hub, auth, transport, dashboard: None, chat: ChatSession::new() }
    }

    /// A failed sign-in leaves the current session and its views alone.
    fn sign_in(&mut self, email: &str, password: &str) -> Result<(), String> {
        match self.hub.sign_in(&self.auth, email, password) {
            Ok(session) => {
                self.dashboard = Some(Dashboard::for_tier(session.tier));
                self.chat = ChatSession::new();
                Ok(())
            }
            Err(e) => {
                log::error!("sign in failed: {e}");
                Err(e.user_message(AuthFlow::SignIn))
            }
        }
    }

    fn sign_out(&mut self) {
        self.dashboard = None;
        self.chat = ChatSession::new();
        self.hub.sign_out();
    }

    fn chat(&mut self, message: &str) {
        self.chat.send(self.hub.session(), message, &self.transport, |partial| {
            log::debug!("chat reply at {} chars", partial.len());
        });
    }

    fn state(&mut self) -> Result<UiState> {
        let dashboard = match self.dashboard.as_mut() {
            Some(d) => {
                d.pump(&mut self.hub)?;
                Some(d.state(&self.hub, Utc::now().date_naive()))
            }
            None => None,
        };
        Ok(UiState {
            session: self.hub.session().cloned(),
            dashboard,
            chat: self.chat.messages().to_vec(),
            ack: None,
            error: None,
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 7u64);
    let customers = parse_arg(&args, "--customers", 24usize);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = find_arg(&args, "--db").unwrap_or(":memory:");

    let config = match find_arg(&args, "--config") {
        Some(path) => HubConfig::load(path)?,
        None => HubConfig::default(),
    };

    if !ipc_mode {
        println!("FinGuard AI - dash-runner");
        println!("  seed:      {seed}");
        println!("  customers: {customers}");
        println!("  db:        {db}");
        println!();
    }

    let store = if db == ":memory:" {
        DocumentStore::in_memory()?
    } else {
        DocumentStore::open(db)?
    };
    store.migrate()?;

    let mut auth = LocalAuthProvider::new(config.min_password_len);
    let mut hub = LiveHub::new(store, config)?;
    let accounts = seed::seed_demo(&mut hub, &mut auth, seed, customers, Utc::now())?;

    let mut shell = Shell::new(hub, auth);
    if ipc_mode {
        run_ipc_loop(&mut shell)?;
    } else {
        print_summary(&mut shell, &accounts)?;
    }
    Ok(())
}

fn run_ipc_loop(shell: &mut Shell) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let mut ack = None;
        let mut error = None;
        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {}
            IpcCommand::SignIn { email, password } => {
                error = shell.sign_in(&email, &password).err();
            }
            IpcCommand::SignOut => shell.sign_out(),
            IpcCommand::Acknowledge { alert_id } => {
                ack = match shell.hub.acknowledge_alert(&alert_id) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        log::error!("error acknowledging alert {alert_id}: {e}");
                        error = Some(e.to_string());
                        None
                    }
                };
            }
            IpcCommand::Chat { message } => shell.chat(&message),
            IpcCommand::Write { path, data } => {
                if let Err(e) = DocPath::parse(&path).and_then(|p| shell.hub.store().set_document(&p, &data)) {
                    error = Some(e.to_string());
                }
            }
            IpcCommand::RefreshMetrics { institution_id } => {
                if let Err(e) = shell.hub.store().refresh_institution_metrics(&institution_id, Utc::now()) {
                    log::error!("error refreshing metrics for {institution_id}: {e}");
                    error = Some(e.to_string());
                }
            }
        }

        let mut state = shell.state()?;
        state.ack = ack;
        state.error = error;
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(shell: &mut Shell, accounts: &seed::DemoAccounts) -> Result<()> {
    let logins = [
        ("consumer", "consumer@finguard.demo", &accounts.consumer),
        ("institution", "institution@finguard.demo", &accounts.institution),
        ("analyst", "analyst@finguard.demo", &accounts.analyst),
    ];
    for (label, email, id) in logins {
        if let Err(message) = shell.sign_in(email, seed::DEMO_PASSWORD) {
            println!("  {label}: sign in failed: {message}");
            continue;
        }
        let state = shell.state()?;
        println!("=== {} ({id}) ===", label.to_uppercase());
        match state.dashboard {
            Some(DashboardState::Consumer(c)) => {
                let score = c.risk.map(|r| r.value).unwrap_or_default();
                println!("  risk score:     {score:.1}");
                println!("  transactions:   {}", c.transactions.len());
                println!(
                    "  alerts:         {} ({} open)",
                    c.alert_summary.total, c.alert_summary.unacknowledged
                );
                for slice in &c.spending_by_category {
                    println!("  {:<14}  ${:>9.2}  {:>3}%", slice.name, slice.amount, slice.percentage);
                }
            }
            Some(DashboardState::Institution(i)) => {
                println!("  members:        {}", i.members);
                if let Some(m) = &i.metrics {
                    println!("  average risk:   {:.1}", m.average_risk);
                    println!("  compliance:     {:.1}%", m.compliance_rate);
                }
                for bucket in &i.distribution {
                    println!("  {:<8} {}", bucket.name, bucket.value);
                }
            }
            Some(DashboardState::Analyst(a)) => {
                for card in &a.clients {
                    println!(
                        "  {:<20} {:>5.1}  {:?}",
                        card.name, card.risk_score, card.risk_level
                    );
                }
            }
            None => println!("  (no dashboard)"),
        }
        println!();
    }
    shell.sign_out();
    Ok(())
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finguard_core::types::Tier;

    fn shell_with_alice() -> Shell {
        let mut hub = LiveHub::build_test().expect("hub");
        let mut auth = LocalAuthProvider::new(6);
        hub.sign_up(&mut auth, "alice@example.com", "hunter22", "Alice", Tier::Consumer)
            .expect("sign up");
        hub.sign_out();
        Shell::new(hub, auth)
    }

    #[test]
    fn failed_sign_in_keeps_dashboard() {
        let mut shell = shell_with_alice();
        shell.sign_in("alice@example.com", "hunter22").expect("sign in");
        assert!(shell.state().expect("state").dashboard.is_some());

        let err = shell.sign_in("alice@example.com", "wrong-pass").unwrap_err();
        assert_eq!(err, "Invalid email or password.");

        let state = shell.state().expect("state");
        assert_eq!(state.session.map(|s| s.email), Some("alice@example.com".to_string()));
        assert!(matches!(state.dashboard, Some(DashboardState::Consumer(_))));
    }

    #[test]
    fn sign_out_clears_views() {
        let mut shell = shell_with_alice();
        shell.sign_in("alice@example.com", "hunter22").expect("sign in");
        shell.sign_out();
        let state = shell.state().expect("state");
        assert!(state.session.is_none());
        assert!(state.dashboard.is_none());
        assert!(state.chat.is_empty());
    }
}

use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use crossterm::execute;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use waitlist::verification::{ResendOtpResponse, SendOtpResponse, VerifyOtpResponse};
use waitlist::{AppConfig, FileStore, SystemClock, User, WaitlistApp};

#[derive(Parser, Debug)]
#[command(name = "waitlist")]
#[command(about = "Interactive waitlist and email verification console", long_about = None)]
#[command(version)]
struct Args {
    /// JSON file backing the store (overrides configuration)
    #[arg(short, long, env = "WAITLIST_DATA")]
    data: Option<String>,

    /// Issue this fixed code instead of random ones (development only)
    #[arg(long, env = "WAITLIST_DEV_CODE")]
    dev_code: Option<String>,

    /// Simulate network latency before each operation
    #[arg(long, default_value = "false")]
    latency: bool,
}

enum Command {
    Register { email: String, code: Option<String> },
    Login(String),
    Logout,
    Me,
    Queue,
    Referrals,
    Send(String),
    Verify { email: String, code: String },
    Resend(String),
    Status,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(input: &str) -> Self {
        let input = input.trim();

        if input.is_empty() {
            return Command::Unknown(String::new());
        }

        if !input.starts_with('/') {
            return Command::Unknown(
                "Commands must start with '/'. Type /help for available commands.".to_string(),
            );
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();
        let arg1 = parts.next().map(str::to_string);
        let arg2 = parts.next().map(str::to_string);

        let usage = |text: &str| Command::Unknown(format!("Usage: {text}"));

        match (cmd.as_str(), arg1, arg2) {
            ("/register" | "/r", Some(email), code) => Command::Register { email, code },
            ("/register" | "/r", None, _) => usage("/register <email> [referral-code]"),
            ("/login" | "/l", Some(email), _) => Command::Login(email),
            ("/login" | "/l", None, _) => usage("/login <email>"),
            ("/logout", _, _) => Command::Logout,
            ("/me", _, _) => Command::Me,
            ("/queue" | "/q", _, _) => Command::Queue,
            ("/referrals" | "/ref", _, _) => Command::Referrals,
            ("/send", Some(email), _) => Command::Send(email),
            ("/send", None, _) => usage("/send <email>"),
            ("/verify" | "/v", Some(email), Some(code)) => Command::Verify { email, code },
            ("/verify" | "/v", _, _) => usage("/verify <email> <code>"),
            ("/resend", Some(email), _) => Command::Resend(email),
            ("/resend", None, _) => usage("/resend <email>"),
            ("/status" | "/st", _, _) => Command::Status,
            ("/reset", _, _) => Command::Reset,
            ("/help" | "/h" | "/?", _, _) => Command::Help,
            ("/quit" | "/exit", _, _) => Command::Quit,
            _ => Command::Unknown(format!(
                "Unknown command: {cmd}. Type /help for available commands."
            )),
        }
    }
}

fn print_colored(color: Color, text: &str) {
    let mut stdout = io::stdout();
    execute!(stdout, SetForegroundColor(color), Print(text), ResetColor).ok();
    stdout.flush().ok();
}

fn println_colored(color: Color, text: &str) {
    print_colored(color, text);
    println!();
}

fn display_banner() {
    println!();
    println_colored(
        Color::Cyan,
        "+---------------------------------------------------------+",
    );
    println_colored(
        Color::Cyan,
        "|              Waitlist & Verification Console            |",
    );
    println_colored(
        Color::Cyan,
        "+---------------------------------------------------------+",
    );
    println!();
}

fn display_help() {
    println!();
    println_colored(Color::Yellow, "Available Commands:");
    println!();
    println!("  /register <email> [code] - Join the waitlist, optionally with a referral code");
    println!("  /login <email>           - Sign in as an existing user");
    println!("  /logout                  - Sign out");
    println!("  /me                      - Show the signed-in user");
    println!("  /queue                   - Show your queue position");
    println!("  /referrals               - Show your referrals and milestones");
    println!("  /send <email>            - Send a verification code");
    println!("  /verify <email> <code>   - Verify a code");
    println!("  /resend <email>          - Resend a verification code");
    println!("  /status                  - Show verification status");
    println!("  /reset                   - Discard the verification in progress");
    println!("  /help                    - Show this help message");
    println!("  /quit or /exit           - Exit");
    println!();
}

fn display_prompt(who: Option<&User>) {
    let name = who.map(|u| u.email.as_str()).unwrap_or("guest");
    print_colored(Color::Green, &format!("waitlist@{name}"));
    print_colored(Color::White, "> ");
    io::stdout().flush().ok();
}

fn display_user(user: &User) {
    println_colored(Color::Cyan, &format!("  Email: {}", user.email));
    println_colored(Color::White, &format!("  Referral code: {}", user.referral_code));
    println_colored(Color::White, &format!("  Position: {}", user.position));
    println_colored(Color::White, &format!("  Referrals: {}", user.referral_count));
}

fn report(success: bool, message: &str) {
    let color = if success { Color::Green } else { Color::Red };
    println_colored(color, message);
}

async fn run_command(app: &WaitlistApp, command: Command) -> bool {
    match command {
        Command::Register { email, code } => {
            match app
                .registry
                .register(&app.session, &email, code.as_deref())
                .await
            {
                Ok(user) => {
                    println_colored(Color::Green, "Welcome to the waitlist!");
                    display_user(&user);
                }
                Err(e) => println_colored(Color::Red, &e.to_string()),
            }
        }
        Command::Login(email) => match app.registry.login(&app.session, &email).await {
            Ok(Some(user)) => {
                println_colored(Color::Green, "Welcome back!");
                display_user(&user);
            }
            Ok(None) => println_colored(Color::Yellow, "No user registered with that email."),
            Err(e) => println_colored(Color::Red, &e.to_string()),
        },
        Command::Logout => {
            app.registry.logout(&app.session);
            println_colored(Color::White, "Signed out.");
        }
        Command::Me => match app.registry.current_user(&app.session) {
            Some(user) => display_user(&user),
            None => println_colored(Color::Yellow, "Not signed in."),
        },
        Command::Queue => {
            let Some(user) = app.registry.current_user(&app.session) else {
                println_colored(Color::Yellow, "Not signed in.");
                return true;
            };
            match app.registry.queue_position(&user.id).await {
                Ok(Some(stats)) => println_colored(
                    Color::Cyan,
                    &format!(
                        "  #{} of {} ({} referrals)",
                        stats.position, stats.total, stats.referral_count
                    ),
                ),
                Ok(None) => println_colored(Color::Yellow, "User no longer registered."),
                Err(e) => println_colored(Color::Red, &e.to_string()),
            }
        }
        Command::Referrals => {
            let Some(user) = app.registry.current_user(&app.session) else {
                println_colored(Color::Yellow, "Not signed in.");
                return true;
            };
            match app.registry.referral_stats(&user.id).await {
                Ok(Some(stats)) => {
                    println_colored(
                        Color::Cyan,
                        &format!("  Code {}: {} referral(s)", stats.code, stats.count),
                    );
                    for referred in &stats.users {
                        println_colored(Color::White, &format!("    {}", referred.email));
                    }
                    if let Some(progress) = app.milestone_progress(stats.count) {
                        if progress.all_unlocked() {
                            println_colored(Color::Yellow, "  All milestones unlocked!");
                        } else {
                            println_colored(
                                Color::Yellow,
                                &format!(
                                    "  {} more to unlock: {} ({:.0}%)",
                                    progress.remaining, progress.next.reward, progress.percent
                                ),
                            );
                        }
                    }
                }
                Ok(None) => println_colored(Color::Yellow, "User no longer registered."),
                Err(e) => println_colored(Color::Red, &e.to_string()),
            }
        }
        Command::Send(email) => {
            let response = SendOtpResponse::from(app.verification.send_otp(&email).await);
            report(response.success, &response.message);
        }
        Command::Verify { email, code } => {
            let response = VerifyOtpResponse::from(app.verification.verify_otp(&email, &code).await);
            report(response.success, &response.message);
        }
        Command::Resend(email) => {
            let response = ResendOtpResponse::from(app.verification.resend_otp(&email).await);
            report(response.success, &response.message);
        }
        Command::Status => match app.verification.status() {
            Ok(status) => {
                println!();
                println_colored(Color::Cyan, "Verification Status:");
                println_colored(
                    Color::White,
                    &format!("  In progress: {}", status.in_progress),
                );
                if let Some(email) = &status.email {
                    println_colored(Color::White, &format!("  Email: {email}"));
                }
                if let Some(remaining) = status.attempts_remaining {
                    println_colored(Color::White, &format!("  Attempts remaining: {remaining}"));
                }
                if let Some(until) = status.locked_until {
                    println_colored(Color::White, &format!("  Locked until: {until}"));
                }
                println_colored(Color::White, &format!("  Can resend: {}", status.can_resend));
                println!();
            }
            Err(e) => println_colored(Color::Red, &e.to_string()),
        },
        Command::Reset => match app.verification.reset() {
            Ok(()) => println_colored(Color::White, "Verification reset."),
            Err(e) => println_colored(Color::Red, &e.to_string()),
        },
        Command::Help => display_help(),
        Command::Quit => return false,
        Command::Unknown(msg) => {
            if !msg.is_empty() {
                println_colored(Color::Red, &msg);
            }
        }
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    display_banner();

    let mut config = AppConfig::from_env().unwrap_or_else(|e| {
        error!("Failed to load configuration: {e}");
        info!("Using default configuration");
        AppConfig::default()
    });

    if let Some(path) = args.data {
        config.storage.path = path;
    }
    if args.dev_code.is_some() {
        config.verification.fixed_code = args.dev_code;
        config.verification.log_codes = true;
    }
    config.latency.enabled |= args.latency;

    if let Err(e) = config.validate() {
        println_colored(Color::Red, &format!("Configuration validation failed: {e}"));
        return Err(format!("Invalid configuration: {e}").into());
    }

    let store = Arc::new(FileStore::open(&config.storage.path)?);
    let app = WaitlistApp::new(&config, store, Arc::new(SystemClock));

    println_colored(
        Color::Green,
        &format!("Using store at {}", config.storage.path),
    );
    println_colored(
        Color::White,
        &format!(
            "  Latency simulation: {}",
            if config.latency.enabled { "enabled" } else { "disabled" }
        ),
    );
    println!();
    println_colored(
        Color::Yellow,
        "Type /help for available commands or /quit to exit",
    );
    println!();

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        display_prompt(app.registry.current_user(&app.session).as_ref());

        line.clear();
        let read = tokio::select! {
            read = reader.read_line(&mut line) => read,
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C signal");
                break;
            }
        };

        match read {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                println_colored(Color::Red, &format!("Error reading input: {e}"));
                continue;
            }
        }

        if !run_command(&app, Command::parse(&line)).await {
            break;
        }
    }

    println!();
    println_colored(Color::Green, "Goodbye!");
    Ok(())
}

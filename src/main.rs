use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use auto_solve::infrastructure::{SessionStore, SettingsPatch};
use auto_solve::utils::logging;
use auto_solve::{App, Config};

#[derive(Parser)]
#[command(name = "auto_solve", version, about = "自动完成 LeetCode 每日配额")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 连接浏览器并运行协调器，直到 Ctrl-C
    Run {
        /// 启动后立即开始解题
        #[arg(long)]
        start: bool,
    },
    /// 显示今日进度
    Status,
    /// 显示最近的活动日志
    Logs {
        /// 显示条数
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// 修改登录凭据、每日配额和自动运行开关
    Config {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        daily_limit: Option<u32>,
        #[arg(long)]
        auto_run: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 加载配置
    let config = Config::load()?;

    match args.command {
        Command::Run { start } => {
            logging::init(&config.output_log_file, config.verbose_logging)?;
            App::initialize(config).await?.run(start).await?;
        }
        Command::Status => {
            logging::init_console();
            let doc = SessionStore::open(&config.store_path).snapshot().await?;
            let session = &doc.session;
            println!("状态: {}", session.loop_state());
            println!("进度: {}", session.progress());
            println!("日期: {}", display_or_dash(&session.last_solved_date));
            println!("自动运行: {}", if session.auto_run { "开" } else { "关" });
            println!("登录账号: {}", display_or_dash(&doc.credentials.leetcode_username));
        }
        Command::Logs { limit } => {
            logging::init_console();
            let doc = SessionStore::open(&config.store_path).snapshot().await?;
            if doc.logs.is_empty() {
                println!("(暂无日志)");
            }
            for entry in doc.logs.latest(limit) {
                let time = chrono::DateTime::from_timestamp_millis(entry.timestamp)
                    .map(|t| t.with_timezone(&chrono::Local).format("%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!("[{}] {:<7} {}", time, entry.level, entry.message);
            }
        }
        Command::Config {
            username,
            password,
            daily_limit,
            auto_run,
        } => {
            logging::init_console();
            let patch = SettingsPatch {
                username,
                password,
                daily_limit,
                auto_run,
            };
            let store = SessionStore::open(&config.store_path);
            let doc = if patch.is_empty() {
                store.snapshot().await?
            } else {
                store
                    .apply_settings(patch)
                    .await
                    .context("保存设置失败")?
            };
            println!("登录账号: {}", display_or_dash(&doc.credentials.leetcode_username));
            println!(
                "登录密码: {}",
                if doc.credentials.leetcode_password.is_empty() { "-" } else { "******" }
            );
            println!("每日配额: {}", doc.session.daily_limit);
            println!("自动运行: {}", if doc.session.auto_run { "开" } else { "关" });
        }
    }

    Ok(())
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

use clap::Parser;
use client::{PhoneClient, Step};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8888")]
    server: String,

    /// How long to wait for replies after each step, in milliseconds
    #[arg(short = 'r', long, default_value = "300")]
    reply_wait: u64,

    /// Steps to run in order, e.g. `name:Alice talk accept fragment:fragment1 track`
    steps: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let steps = args
        .steps
        .iter()
        .map(|text| Step::parse(text))
        .collect::<Result<Vec<_>, _>>()?;
    let reply_wait = Duration::from_millis(args.reply_wait);

    info!("Connecting to: {}", args.server);
    let mut phone = PhoneClient::connect(&args.server).await?;
    print_replies(&mut phone, reply_wait).await?;

    for step in steps {
        match step {
            Step::Send(frame) => phone.send_json(&frame).await?,
            Step::Raw(text) => phone.send_raw(&text).await?,
            Step::Wait(duration) => {
                tokio::time::sleep(duration).await;
                continue;
            }
        }
        print_replies(&mut phone, reply_wait).await?;
    }

    info!("Received {} messages, closing", phone.received_count());
    phone.close().await?;
    Ok(())
}

async fn print_replies(
    phone: &mut PhoneClient,
    wait: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for message in phone.drain(wait).await? {
        println!("{}", message.to_json()?);
    }
    Ok(())
}

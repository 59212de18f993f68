use anyhow::{Context, Result};
use retroserial::{LinkConfig, Profile};

const DEFAULT_MESSAGE: &str = "Hello, 8251!";

fn parse_payload(arg: &str) -> Result<Vec<u8>> {
    match arg.strip_prefix("random:") {
        Some(count) => {
            let count: usize = count
                .parse()
                .with_context(|| format!("Invalid random payload length '{}'", count))?;
            log::info!("Generating {} random bytes", count);
            Ok((0..count).map(|_| rand::random::<u8>()).collect())
        }
        None => Ok(arg.as_bytes().to_vec()),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let profile: Profile = match args.next() {
        Some(name) => name.parse()?,
        None => Profile::default(),
    };
    let payload = match args.next() {
        Some(arg) => parse_payload(&arg)?,
        None => {
            log::info!("No payload provided, sending '{}'", DEFAULT_MESSAGE);
            DEFAULT_MESSAGE.as_bytes().to_vec()
        }
    };

    let config = LinkConfig::builder()
        .profile(profile)
        .payload(payload)
        .flow_control(!profile.mode().is_sync())
        .build();
    let report = retroserial::run(&config)?;

    println!(
        "{}: {} bytes in {} ticks ({} held by CTS), receiver status 0x{:02X}",
        report.profile,
        report.received.len(),
        report.ticks,
        report.held_ticks,
        report.receiver_status
    );
    println!("{}", String::from_utf8_lossy(&report.received));
    Ok(())
}

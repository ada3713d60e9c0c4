use notifyd::config::Config;

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    notifyd::logger::init(&config)?;

    let _registry = notifyd::startup(&config)?;

    // Wiring a request front-end onto the registry is out of scope here;
    // without one there is nothing left to drive.
    log::warn!("registry constructed with no front-end attached, exiting");

    Ok(())
}

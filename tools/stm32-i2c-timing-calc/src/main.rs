use clap::Parser as _;
use simple_logger::SimpleLogger;
use stm32_i2c_timing::{Hertz, compute_timing_for_target};

#[derive(clap::Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// I2C peripheral source clock in Hz.
    #[arg(short, long, default_value_t = 8_000_000)]
    bus_clock: u32,
    /// Target I2C bus speed in Hz.
    #[arg(short, long, default_value_t = 100_000)]
    speed: u32,
    /// Take the analog noise filter delays into account.
    #[arg(short = 'a', long)]
    use_analog_filter: bool,
}

fn main() {
    SimpleLogger::new().init().unwrap();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and argument errors both terminate with exit code 1.
            let _ = err.print();
            std::process::exit(1);
        }
    };

    log::info!("use analog filter: {}", cli.use_analog_filter);
    log::info!("I2C bus clock: {} Hz", cli.bus_clock);
    log::info!("I2C speed: {} Hz", cli.speed);

    match compute_timing_for_target(
        Hertz::from_raw(cli.bus_clock),
        Hertz::from_raw(cli.speed),
        cli.use_analog_filter,
    ) {
        Ok(timingr) => {
            println!("I2C_TIMINGR: {:08X}", timingr.raw_value());
            println!("Prescaler: {}", timingr.presc());
            println!("SCL low period: {}", timingr.scll());
            println!("SCL high period: {}", timingr.sclh());
            println!("SDA delay (data hold time): {}", timingr.sdadel());
            println!("SCL delay (data setup time): {}", timingr.scldel());
        }
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    }
}

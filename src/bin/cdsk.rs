extern crate clap;
extern crate cpcdsk;

use clap::{App, AppSettings, Arg, SubCommand};
use std::io::{self, Write};
use std::process;

use cpcdsk::cpm::AmsDos;
use cpcdsk::disk::{self, Disk};

// Possible exit codes
static _EXIT_SUCCESS: i32 = 0;
static EXIT_FAILURE: i32 = 1;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse command-line arguments
    let app = App::new("Amstrad DSK Image Utility")
        .version("0.1.0")
        .about("Examine CPCEMU DSK disk images and the CP/M filesystem on them.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("diskimage").required(true))
        .subcommand(
            SubCommand::with_name("geometry")
                .about("Show the disk information block and the track layout"),
        )
        .subcommand(
            SubCommand::with_name("dir").about("List every directory record, unmerged"),
        )
        .subcommand(SubCommand::with_name("cat").about("Show the catalog, as AMSDOS CAT does"))
        .subcommand(
            SubCommand::with_name("dpb").about("Show the derived disk parameter block"),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Provide a hex dump of a disk image or one of its tracks.")
                .arg(
                    Arg::with_name("track")
                        .validator(u8_validator)
                        .required(false),
                )
                .arg(
                    Arg::with_name("side")
                        .validator(u8_validator)
                        .required(false),
                ),
        );

    let mut app_clone = app.clone();
    let matches = app.get_matches();

    let diskimage = match matches.value_of("diskimage") {
        Some(diskimage) => diskimage,
        None => process::exit(EXIT_FAILURE),
    };
    let result = match matches.subcommand() {
        ("geometry", Some(_)) => cmd_geometry(diskimage),
        ("dir", Some(_)) => cmd_dir(diskimage),
        ("cat", Some(_)) => cmd_cat(diskimage),
        ("dpb", Some(_)) => cmd_dpb(diskimage),
        ("dump", Some(m)) => cmd_dump(
            diskimage,
            m.value_of("track").and_then(|t| t.parse::<u8>().ok()),
            m.value_of("side").and_then(|s| s.parse::<u8>().ok()),
        ),
        _ => {
            let _ = app_clone.print_help();
            println!();
            process::exit(EXIT_FAILURE);
        }
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(EXIT_FAILURE);
    }
}

/// Require a track or side argument to be a number in the range 0-255.
fn u8_validator(v: String) -> Result<(), String> {
    match v.parse::<u8>() {
        Ok(_) => Ok(()),
        Err(_) => Err("Expected a value from 0-255.".to_string()),
    }
}

fn open(diskimage: &str) -> io::Result<Disk> {
    let disk = disk::open(diskimage)?;
    for warning in disk.warnings() {
        log::warn!("{}", warning);
    }
    Ok(disk)
}

fn cmd_geometry(diskimage: &str) -> io::Result<()> {
    let disk = open(diskimage)?;
    print!("{}", disk);
    Ok(())
}

fn cmd_dir(diskimage: &str) -> io::Result<()> {
    let disk = open(diskimage)?;
    let amsdos = AmsDos::new(&disk)?;
    println!("{}", amsdos.listing());
    Ok(())
}

fn cmd_cat(diskimage: &str) -> io::Result<()> {
    let disk = open(diskimage)?;
    let amsdos = AmsDos::new(&disk)?;
    println!("{}", amsdos.catalog());
    Ok(())
}

fn cmd_dpb(diskimage: &str) -> io::Result<()> {
    let disk = open(diskimage)?;
    let amsdos = AmsDos::new(&disk)?;
    println!("{}", amsdos.dpb);
    Ok(())
}

fn cmd_dump(diskimage: &str, track: Option<u8>, side: Option<u8>) -> io::Result<()> {
    let disk = open(diskimage)?;
    let selection = track.map(|t| (t, side.unwrap_or(0)));
    if let Some((track, side)) = selection {
        if disk.track(track, side).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("side {} track {} is not in the image", side, track),
            ));
        }
    }
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    disk.dump(&mut stdout, selection)?;
    stdout.flush()?;
    Ok(())
}

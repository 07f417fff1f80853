use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tempfile::tempdir;
use touch_dimmer::Error;
use touch_dimmer::cli::Cli;
use touch_dimmer::clock::TimeOfDay;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("touch-dimmer").chain(args.iter().copied()))
}

#[test]
fn positional_arguments_resolve_into_config() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    let cli = parse(&["5", dir, "10", "60", "22:30-07:00", "event0", "event3"]).unwrap();
    let config = cli.into_config().unwrap();

    assert_eq!(config.slide_timeout, Duration::from_secs(300));
    assert_eq!(config.dim_timeout, Duration::from_secs(600));
    assert_eq!(config.min_brightness, 60);
    assert_eq!(config.initial_brightness, 200);
    let window = config.blank_window.unwrap();
    assert_eq!(window.start, TimeOfDay::new(22, 30).unwrap());
    assert_eq!(window.end, TimeOfDay::new(7, 0).unwrap());
    assert_eq!(
        config.devices,
        vec![
            PathBuf::from("/dev/input/event0"),
            PathBuf::from("/dev/input/event3")
        ]
    );
    assert_eq!(
        config.backlight_dir,
        PathBuf::from("/sys/class/backlight/rpi_backlight")
    );
    assert_eq!(config.tick_interval, Duration::from_secs(30));
}

#[test]
fn slideshow_command_carries_pictures_and_display() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    let cli = parse(&[
        "1",
        dir,
        "0",
        "50",
        "00:00-00:00",
        "event0",
        "--slide-interval",
        "15",
        "--display",
        ":1",
    ])
    .unwrap();
    let config = cli.into_config().unwrap();

    assert_eq!(config.slideshow.program, PathBuf::from("/usr/local/bin/slide"));
    assert_eq!(config.slideshow.args, ["-t", "15", "-p", dir, "-s", "-r"]);
    assert_eq!(
        config.slideshow.env,
        vec![
            ("DISPLAY".to_string(), ":1".to_string()),
            ("XAUTHORITY".to_string(), "/home/pi/.Xauthority".to_string()),
        ]
    );
}

#[test]
fn zero_length_blank_period_disables_blanking() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    let config = parse(&["1", dir, "1", "50", "00:00-00:00", "event0"])
        .unwrap()
        .into_config()
        .unwrap();
    assert!(config.blank_window.is_none());
}

#[test]
fn options_override_defaults() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    let config = parse(&[
        "1",
        dir,
        "1",
        "50",
        "23:00-06:00",
        "touch",
        "--input-dir",
        "/dev/input/by-id",
        "--backlight",
        "/sys/class/backlight/10-0045",
        "--initial-brightness",
        "255",
        "--tick-interval",
        "2s",
    ])
    .unwrap()
    .into_config()
    .unwrap();

    assert_eq!(config.devices, vec![PathBuf::from("/dev/input/by-id/touch")]);
    assert_eq!(
        config.backlight_dir,
        PathBuf::from("/sys/class/backlight/10-0045")
    );
    assert_eq!(config.initial_brightness, 255);
    assert_eq!(config.tick_interval, Duration::from_secs(2));
}

#[test]
fn min_brightness_outside_range_is_rejected() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    assert!(parse(&["1", dir, "1", "49", "00:00-00:00", "event0"]).is_err());
    assert!(parse(&["1", dir, "1", "255", "00:00-00:00", "event0"]).is_err());
    assert!(parse(&["1", dir, "1", "254", "00:00-00:00", "event0"]).is_ok());
}

#[test]
fn malformed_blank_period_is_rejected() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    for period in ["22:00", "25:00-06:00", "22:00-06:61", "late-early"] {
        assert!(
            parse(&["1", dir, "1", "50", period, "event0"]).is_err(),
            "{period} accepted"
        );
    }
}

#[test]
fn missing_device_list_is_rejected() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    assert!(parse(&["1", dir, "1", "50", "00:00-00:00"]).is_err());
}

#[test]
fn non_numeric_timeout_is_rejected() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    assert!(parse(&["soon", dir, "1", "50", "00:00-00:00", "event0"]).is_err());
}

#[test]
fn missing_pictures_directory_is_rejected() {
    let pictures = tempdir().unwrap();
    let missing = pictures.path().join("nope");
    let cli = parse(&[
        "1",
        missing.to_str().unwrap(),
        "1",
        "50",
        "00:00-00:00",
        "event0",
    ])
    .unwrap();
    assert!(matches!(cli.into_config(), Err(Error::InvalidConfig(_))));
}

#[test]
fn zero_tick_interval_is_rejected() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    let cli = parse(&[
        "1",
        dir,
        "1",
        "50",
        "00:00-00:00",
        "event0",
        "--tick-interval",
        "0s",
    ])
    .unwrap();
    assert!(matches!(cli.into_config(), Err(Error::InvalidConfig(_))));
}

#[test]
fn initial_brightness_below_floor_is_rejected() {
    let pictures = tempdir().unwrap();
    let dir = pictures.path().to_str().unwrap();
    let cli = parse(&[
        "1",
        dir,
        "1",
        "60",
        "00:00-00:00",
        "event0",
        "--initial-brightness",
        "10",
    ])
    .unwrap();
    assert!(matches!(cli.into_config(), Err(Error::InvalidConfig(_))));
}

//! Exit status of the `ngvpn-edge` binary.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn test_version_flag_exits_cleanly() {
    let mut command = cargo_bin_cmd!("ngvpn-edge");
    command.arg("-V");
    command
        .assert()
        .success()
        .stdout(contains("ngvpn-edge "))
        .stdout(contains(std::env::consts::OS));
}

#[test]
fn test_malformed_listen_node_exits_with_failure() {
    let mut command = cargo_bin_cmd!("ngvpn-edge");
    command.env_remove("PROFILING").args(["-L", "not a node"]);
    command.assert().code(1).stderr(contains("Error: "));
}

#[test]
fn test_profiling_addr_without_env_exits_with_failure() {
    let mut command = cargo_bin_cmd!("ngvpn-edge");
    command
        .env_remove("PROFILING")
        .args(["-L", "tcp://127.0.0.1:0", "-F", "http://127.0.0.1:1", "-P", ":7070"]);
    command.assert().code(1).stderr(contains("PROFILING"));
}

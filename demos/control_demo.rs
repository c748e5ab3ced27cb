//! Show the latest build of a job and, optionally, wait for it to finish.
//!
//! Run with:
//! ```bash
//! cargo run --example control_demo
//! ```
//!
//! Reads `JENKINS_URL`, `JENKINS_USER` and `JENKINS_TOKEN` from the process
//! environment or `.env`. Optional:
//! - `JENKINS_JOB` (default: `core`)
//! - `JENKINS_WAIT=1` to wait for the latest build to finish
//! - `JENKINS_TESTRUN_FILE` to append the outcome to a result log

use jenkins_build_control::{
    Auth, BlockingClient, BuildControl, CompletionWait, ControlRequest, JobPath,
    config::{CredentialOverrides, Credentials, Environment},
};
use std::{path::Path, time::Duration};

fn main() -> anyhow::Result<()> {
    let env = Environment::from_process().with_env_file(Path::new(".env"))?;
    let credentials = Credentials::resolve(CredentialOverrides::default(), &env)?;

    let client = BlockingClient::builder(&credentials.base_url)?
        .auth(Auth::from(&credentials))
        .timeout(Duration::from_secs(20))
        .with_crumb()
        .build()?;

    let mut request = ControlRequest::new(JobPath::parse(env.get("JENKINS_JOB").unwrap_or("core"))?);
    request.latest = true;
    if env.get("JENKINS_WAIT").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
        request.wait = Some(CompletionWait {
            timeout: Some(Duration::from_secs(600)),
            poll_interval: Duration::from_secs(10),
        });
    }
    request.record_file = env.get("JENKINS_TESTRUN_FILE").map(Into::into);

    let outcome = BuildControl::new(client).run(&request, std::io::stdout().lock())?;
    match outcome.record {
        Some(entry) => println!("recorded build {:?} of {}", entry.build, entry.job),
        None => println!("nothing recorded"),
    }
    Ok(())
}

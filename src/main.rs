use clap::Parser;
use jenkins_build_control::{
    Auth, BlockingClient, BuildControl, BuildNumber, CompletionWait, ControlRequest, Error,
    JobPath, ParamOverride, QueueItemId,
    config::{CredentialOverrides, Credentials, Environment},
};
use std::{path::PathBuf, process::ExitCode, time::Duration};
use tracing_subscriber::EnvFilter;

/// Stop and rebuild Jenkins builds using the REST API.
#[derive(Parser, Debug)]
#[command(name = "jenkins-build-control", version)]
struct Cli {
    /// Env file to load for Jenkins settings
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Jenkins base URL, default from JENKINS_URL
    #[arg(long)]
    jenkins_url: Option<String>,

    /// Jenkins username, default from JENKINS_USER
    #[arg(long)]
    jenkins_user: Option<String>,

    /// Jenkins API token, default from JENKINS_TOKEN
    #[arg(long)]
    jenkins_token: Option<String>,

    /// Jenkins job name, supports folders (a/b/job)
    #[arg(long)]
    job: String,

    /// Build number to control
    #[arg(long)]
    build: Option<u64>,

    /// Stop the specified build
    #[arg(long)]
    stop: bool,

    /// Rebuild the specified build
    #[arg(long)]
    rebuild: bool,

    /// Show build status
    #[arg(long)]
    status: bool,

    /// Show latest build status
    #[arg(long)]
    latest: bool,

    /// Queue item id to query
    #[arg(long)]
    queue_id: Option<u64>,

    /// Queue item URL to query
    #[arg(long)]
    queue_url: Option<String>,

    /// Wait for the queue item to get a build (default: 30s with --rebuild, 0 otherwise)
    #[arg(long)]
    queue_wait_seconds: Option<u64>,

    /// Wait for build completion
    #[arg(long)]
    wait: bool,

    /// Max seconds to wait for completion (0 = no limit)
    #[arg(long, default_value_t = 0)]
    wait_timeout: u64,

    /// Seconds between completion polls
    #[arg(long, default_value_t = 10)]
    wait_interval: u64,

    /// Append a result line to this file
    #[arg(long)]
    testrun_file: Option<PathBuf>,

    /// Override a build parameter, KEY=VALUE (repeatable)
    #[arg(long = "param")]
    params: Vec<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 20)]
    timeout: u64,

    /// Print the POST requests instead of sending them
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn credential_overrides(&self) -> CredentialOverrides {
        CredentialOverrides {
            base_url: self.jenkins_url.clone(),
            user: self.jenkins_user.clone(),
            token: self.jenkins_token.clone(),
        }
    }

    fn request(&self) -> Result<ControlRequest, Error> {
        let mut request = ControlRequest::new(JobPath::parse(&self.job)?);
        request.build = self.build.map(BuildNumber::new);
        request.stop = self.stop;
        request.rebuild = self.rebuild;
        request.status = self.status;
        request.latest = self.latest;
        request.queue_id = self.queue_id.map(QueueItemId::new);
        request.queue_url = self.queue_url.clone().filter(|url| !url.is_empty());
        request.queue_wait = self.queue_wait_seconds.map(Duration::from_secs);
        request.wait = self.wait.then(|| CompletionWait {
            timeout: (self.wait_timeout > 0).then(|| Duration::from_secs(self.wait_timeout)),
            poll_interval: Duration::from_secs(self.wait_interval.max(1)),
        });
        request.overrides = self
            .params
            .iter()
            .map(|raw| raw.parse::<ParamOverride>())
            .collect::<Result<_, _>>()?;
        request.record_file = self.testrun_file.clone();
        request.dry_run = self.dry_run;
        Ok(request)
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let env = Environment::from_process().with_env_file(&cli.env_file)?;
    let credentials = Credentials::resolve(cli.credential_overrides(), &env)?;
    let request = cli.request()?;

    let client = BlockingClient::builder(&credentials.base_url)?
        .auth(Auth::from(&credentials))
        .timeout(Duration::from_secs(cli.timeout))
        .with_crumb()
        .build()?;

    BuildControl::new(client).run(&request, std::io::stdout().lock())?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            for body in err.body_snippets() {
                eprintln!("{body}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}

//! Shared test doubles

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use honeybee::deploy::compose::ComposeCommand;
use honeybee::deploy::supervisor::SupervisorOptions;
use honeybee::errors::HoneybeeError;
use honeybee::llm::client::ChatTransport;

/// Replies with queued answers, then repeats the fallback forever
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<String, HoneybeeError>>>,
    fallback: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<String, HoneybeeError>>, fallback: &str) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: fallback.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(system, user)` pairs in call order
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, HoneybeeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Wrap `json` the way the model is asked to answer
pub fn fenced(json: &str) -> String {
    format!("Here are the files you asked for.\n\n```json\n{}\n```", json)
}

pub const DOCKERFILE_FILES: &str = r#"[
  {"file_name": "Dockerfile", "file_path": ".", "file_content": "FROM nginx:1.25\nCOPY nginx.conf /etc/nginx/nginx.conf\n", "file_type": "dockerfile"},
  {"file_name": "README.md", "file_path": "docs", "file_content": "Autoindex is on.", "file_type": "markdown"}
]"#;

/// Stand-in for `docker compose`; the subcommand arrives as `$1`
pub const FAKE_COMPOSE: &str = r#"
case "$1" in
  up)
    trap 'echo "gracefully stopping"; exit 0' INT
    echo "container web-1 created"
    echo
    cat docker-compose.yaml
    echo "warning on stderr" >&2
    echo "web-1 | ready"
    while true; do sleep 0.1; done
    ;;
  down)
    echo "container web-1 removed"
    echo "network removed" >&2
    ;;
  ls)
    echo "NAME STATUS CONFIG FILES"
    ;;
esac
"#;

/// Same as [`FAKE_COMPOSE`] but `up` fails right away
pub const CRASHING_COMPOSE: &str = r#"
case "$1" in
  up)
    echo "starting"
    echo "fatal: port is already allocated" >&2
    exit 3
    ;;
  down)
    echo "container web-1 removed"
    ;;
esac
"#;

pub fn supervisor_options(script: &str, temp_root: &std::path::Path) -> SupervisorOptions {
    let parts = vec![
        "sh".to_string(),
        "-c".to_string(),
        script.to_string(),
        "fake-compose".to_string(),
    ];
    SupervisorOptions {
        compose: ComposeCommand::new(&parts).unwrap(),
        compose_file_name: "docker-compose.yaml".to_string(),
        temp_root: temp_root.to_path_buf(),
        stop_timeout: Duration::from_secs(3),
        teardown_on_exit: true,
    }
}

/// `up` writes to stdout and stderr in strict alternation
pub const INTERLEAVED_COMPOSE: &str = r#"
case "$1" in
  up)
    trap 'exit 0' INT
    i=0
    while [ $i -lt 200 ]; do
      echo "out $i"
      echo "err $i" >&2
      i=$((i + 1))
    done
    echo "all written"
    while true; do sleep 0.1; done
    ;;
  down)
    echo "container web-1 removed"
    ;;
esac
"#;

/// `up` shrugs off SIGINT and has to be killed
pub const STUBBORN_COMPOSE: &str = r#"
case "$1" in
  up)
    trap 'echo "interrupt ignored"' INT
    echo "web-1 | ready"
    while true; do sleep 0.1; done
    ;;
  down)
    echo "container web-1 removed"
    ;;
esac
"#;


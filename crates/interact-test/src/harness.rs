//! A session wired to the in-process service

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use interact_core::{InteractiveResult, SessionState};
use interact_runtime::{Session, SessionConfig};
use interact_time::ManualClock;
use interact_transport::{HttpClient, WebSocket};

use crate::frames;
use crate::mock::{MockHttp, MockSocket};
use crate::service::ScriptedService;

pub const HOSTS_URI: &str = "https://hosts.test/api/v1/interactive/hosts";
pub const HOST: &str = "wss://interactive.test/gameClient";
pub const AUTH: &str = "Bearer test-token";
pub const VERSION_ID: &str = "1234";

/// Local time the harness clock starts at
pub const LOCAL_START_MS: u64 = 2_000_000;

pub struct Harness {
    pub session: Session,
    pub socket: Arc<MockSocket>,
    pub http: Arc<MockHttp>,
    pub service: Arc<ScriptedService>,
    pub clock: ManualClock,
}

impl Harness {
    /// Config with short retry intervals
    pub fn config() -> SessionConfig {
        SessionConfig {
            hosts_uri: HOSTS_URI.to_string(),
            initial_retry: Duration::from_millis(10),
            max_retry: Duration::from_millis(50),
            send_retry_pause: Duration::from_millis(10),
            close_timeout: Duration::from_secs(5),
            ..SessionConfig::default()
        }
    }

    pub fn new() -> InteractiveResult<Self> {
        Harness::with_config(Harness::config())
    }

    pub fn with_config(config: SessionConfig) -> InteractiveResult<Self> {
        let socket = Arc::new(MockSocket::new());
        let http = Arc::new(MockHttp::new());
        http.route_hosts(&config.hosts_uri, &[HOST]);
        let service = ScriptedService::new();
        service.install(&socket);
        let clock = ManualClock::new(LOCAL_START_MS);

        let http_client: Arc<dyn HttpClient> = http.clone();
        let web_socket: Arc<dyn WebSocket> = socket.clone();
        let session = Session::with_clock(config, http_client, web_socket, Arc::new(clock.clone()))?;
        Ok(Harness {
            session,
            socket,
            http,
            service,
            clock,
        })
    }

    pub fn connect(&self, set_ready: bool) -> InteractiveResult<()> {
        self.session.connect(AUTH, VERSION_ID, None, set_ready)
    }

    /// Call `run` until `done` holds or `timeout` passes
    pub fn pump_until(&self, timeout: Duration, mut done: impl FnMut(&Session) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let _ = self.session.run(0);
            if done(&self.session) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Push a button press or release from `participant`
    pub fn mock_button_event(&self, participant: &str, control: &str, pressed: bool, transaction: Option<&str>) {
        self.socket
            .deliver(frames::button_input(participant, control, pressed, transaction));
    }

    pub fn mock_participant_join(&self, session_id: &str, username: &str) {
        self.socket.deliver(frames::participant_join(session_id, username));
    }

    pub fn mock_participant_leave(&self, session_id: &str) {
        self.socket.deliver(frames::participant_leave(session_id));
    }

    /// Pump until the session reaches `state`
    pub fn pump_until_state(&self, state: SessionState, timeout: Duration) -> bool {
        self.pump_until(timeout, |session| session.state() == state)
    }
}

/// Poll `check` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while !check() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
    true
}

// Shared helpers for integration tests.
//
// Provides `SimExecutor`, a stateful simulated Windows host that
// interprets the command shapes the providers issue (`reg`, `sc`,
// `schtasks`, `winget`, `tasklist`, `taskkill`, `setx`, `net session`)
// against in-memory tables, so the full engine can be exercised
// end-to-end without a real machine.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use anyhow::Result;
use winsetup_cli::exec::{ExecResult, Executor};

/// The simulated host state. `PartialEq` lets tests assert that two runs
/// leave the machine in the identical end state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimState {
    pub elevated: bool,
    pub winget: bool,
    /// Registry keys, lowercased.
    pub keys: BTreeSet<String>,
    /// `(key, value name)` -> `(type, raw data)`, lowercased lookups.
    pub values: BTreeMap<(String, String), (String, String)>,
    /// Service name -> (`sc qc` START_TYPE token, running).
    pub services: BTreeMap<String, (String, bool)>,
    /// Scheduled task path -> enabled.
    pub tasks: BTreeMap<String, bool>,
    /// Installed package ids.
    pub packages: BTreeSet<String>,
    /// Packages whose install always fails.
    pub broken_packages: BTreeSet<String>,
    /// Running process image names.
    pub processes: BTreeSet<String>,
}

/// A stateful executor double simulating a Windows host.
#[derive(Debug, Default)]
pub struct SimExecutor {
    state: Mutex<SimState>,
    commands: Mutex<Vec<String>>,
}

impl SimExecutor {
    /// An elevated Windows 11 host with winget available.
    pub fn windows11() -> Self {
        Self::with_build(22631)
    }

    /// An elevated Windows 10 host with winget available.
    pub fn windows10() -> Self {
        Self::with_build(19045)
    }

    pub fn with_build(build: u32) -> Self {
        let sim = Self::default();
        {
            let mut state = sim.state.lock().expect("sim state");
            state.elevated = true;
            state.winget = true;
        }
        sim.seed_version(build);
        sim
    }

    fn seed_version(&self, build: u32) {
        self.set_registry_value(
            r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion",
            "CurrentBuildNumber",
            "REG_SZ",
            &build.to_string(),
        );
        self.set_registry_value(
            r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion",
            "CurrentMajorVersionNumber",
            "REG_DWORD",
            "10",
        );
    }

    // ------------------------------------------------------------------
    // Builder-style seeding
    // ------------------------------------------------------------------

    pub fn with_elevated(self, elevated: bool) -> Self {
        self.state.lock().expect("sim state").elevated = elevated;
        self
    }

    pub fn with_winget(self, winget: bool) -> Self {
        self.state.lock().expect("sim state").winget = winget;
        self
    }

    pub fn with_service(self, name: &str, startup_token: &str, running: bool) -> Self {
        self.state
            .lock()
            .expect("sim state")
            .services
            .insert(name.to_string(), (startup_token.to_string(), running));
        self
    }

    pub fn with_task(self, path: &str, enabled: bool) -> Self {
        self.state
            .lock()
            .expect("sim state")
            .tasks
            .insert(path.to_string(), enabled);
        self
    }

    pub fn with_package(self, id: &str) -> Self {
        self.state
            .lock()
            .expect("sim state")
            .packages
            .insert(id.to_string());
        self
    }

    pub fn with_broken_package(self, id: &str) -> Self {
        self.state
            .lock()
            .expect("sim state")
            .broken_packages
            .insert(id.to_string());
        self
    }

    pub fn with_process(self, image: &str) -> Self {
        self.state
            .lock()
            .expect("sim state")
            .processes
            .insert(image.to_string());
        self
    }

    pub fn with_registry_key(self, key: &str) -> Self {
        self.state
            .lock()
            .expect("sim state")
            .keys
            .insert(key.to_lowercase());
        self
    }

    pub fn with_registry_value(self, key: &str, name: &str, reg_type: &str, data: &str) -> Self {
        self.set_registry_value(key, name, reg_type, data);
        self
    }

    fn set_registry_value(&self, key: &str, name: &str, reg_type: &str, data: &str) {
        let mut state = self.state.lock().expect("sim state");
        state.keys.insert(key.to_lowercase());
        state.values.insert(
            (key.to_lowercase(), name.to_lowercase()),
            (reg_type.to_string(), data.to_string()),
        );
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// A snapshot of the full host state.
    pub fn state(&self) -> SimState {
        self.state.lock().expect("sim state").clone()
    }

    /// Raw data of a registry value, if set.
    pub fn registry_value(&self, key: &str, name: &str) -> Option<String> {
        self.state
            .lock()
            .expect("sim state")
            .values
            .get(&(key.to_lowercase(), name.to_lowercase()))
            .map(|(_, data)| data.clone())
    }

    pub fn service_startup(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .expect("sim state")
            .services
            .get(name)
            .map(|(startup, _)| startup.clone())
    }

    pub fn task_enabled(&self, path: &str) -> Option<bool> {
        self.state.lock().expect("sim state").tasks.get(path).copied()
    }

    pub fn package_installed(&self, id: &str) -> bool {
        self.state.lock().expect("sim state").packages.contains(id)
    }

    pub fn process_running(&self, image: &str) -> bool {
        self.state.lock().expect("sim state").processes.contains(image)
    }

    /// Every command issued so far, rendered as `program arg1 arg2 …`.
    pub fn commands_run(&self) -> Vec<String> {
        self.commands.lock().expect("sim commands").clone()
    }

    // ------------------------------------------------------------------
    // Command interpretation
    // ------------------------------------------------------------------

    fn dispatch(&self, program: &str, args: &[&str]) -> ExecResult {
        self.commands
            .lock()
            .expect("sim commands")
            .push(format!("{program} {}", args.join(" ")));

        match program {
            "net" => self.net(args),
            "reg" => self.reg(args),
            "sc" => self.sc(args),
            "schtasks" => self.schtasks(args),
            "winget" => self.winget(args),
            "tasklist" => self.tasklist(args),
            "taskkill" => self.taskkill(args),
            "setx" => self.setx(args),
            "cmd" => ok(""),
            _ => fail(&format!("'{program}' is not recognized")),
        }
    }

    fn net(&self, args: &[&str]) -> ExecResult {
        if matches!(args, ["session"]) && self.state.lock().expect("sim state").elevated {
            ok("There are no entries in the list.")
        } else {
            fail("Access is denied.")
        }
    }

    fn reg(&self, args: &[&str]) -> ExecResult {
        match args {
            ["query", key] => {
                let key_lc = key.to_lowercase();
                let state = self.state.lock().expect("sim state");
                if state.keys.contains(&key_lc)
                    || state.values.keys().any(|(k, _)| *k == key_lc)
                {
                    ok(&format!("{key}\r\n"))
                } else {
                    fail("ERROR: The system was unable to find the specified registry key or value.")
                }
            }
            ["query", key, "/v", name] => {
                let state = self.state.lock().expect("sim state");
                state
                    .values
                    .get(&(key.to_lowercase(), name.to_lowercase()))
                    .map_or_else(
                        || {
                            fail("ERROR: The system was unable to find the specified registry key or value.")
                        },
                        |(reg_type, data)| {
                            ok(&format!(
                                "{key}\r\n    {name}    {reg_type}    {}\r\n",
                                render_data(reg_type, data)
                            ))
                        },
                    )
            }
            ["add", key, "/v", name, "/t", reg_type, "/d", data, "/f"] => {
                self.set_registry_value(key, name, reg_type, data);
                ok("The operation completed successfully.")
            }
            ["add", key, "/f"] => {
                self.state
                    .lock()
                    .expect("sim state")
                    .keys
                    .insert(key.to_lowercase());
                ok("The operation completed successfully.")
            }
            ["delete", key, "/f"] => {
                let key_lc = key.to_lowercase();
                let mut state = self.state.lock().expect("sim state");
                let existed = state.keys.contains(&key_lc)
                    || state.values.keys().any(|(k, _)| *k == key_lc);
                state.keys.retain(|k| !k.starts_with(&key_lc));
                state.values.retain(|(k, _), _| !k.starts_with(&key_lc));
                if existed {
                    ok("The operation completed successfully.")
                } else {
                    fail("ERROR: The system was unable to find the specified registry key or value.")
                }
            }
            _ => fail("ERROR: Invalid syntax."),
        }
    }

    fn sc(&self, args: &[&str]) -> ExecResult {
        let mut state = self.state.lock().expect("sim state");
        match args {
            ["qc", name] => state.services.get(*name).map_or_else(
                || fail("[SC] OpenService FAILED 1060: The specified service does not exist."),
                |(startup, _)| {
                    ok(&format!(
                        "[SC] QueryServiceConfig SUCCESS\r\n\r\nSERVICE_NAME: {name}\r\n        START_TYPE         : 4   {startup}\r\n"
                    ))
                },
            ),
            ["query", name] => state.services.get(*name).map_or_else(
                || fail("[SC] EnumQueryServicesStatus:OpenService FAILED 1060"),
                |(_, running)| {
                    let token = if *running { "4  RUNNING" } else { "1  STOPPED" };
                    ok(&format!(
                        "SERVICE_NAME: {name}\r\n        STATE              : {token}\r\n"
                    ))
                },
            ),
            ["stop", name] => match state.services.get_mut(*name) {
                Some((_, running)) => {
                    *running = false;
                    ok("")
                }
                None => fail("[SC] OpenService FAILED 1060"),
            },
            ["config", name, "start=", mode] => {
                let token = match *mode {
                    "disabled" => "DISABLED",
                    "demand" => "DEMAND_START",
                    "auto" => "AUTO_START",
                    _ => return fail("[SC] Invalid start mode"),
                };
                match state.services.get_mut(*name) {
                    Some((startup, _)) => {
                        *startup = token.to_string();
                        ok("[SC] ChangeServiceConfig SUCCESS")
                    }
                    None => fail("[SC] OpenService FAILED 1060"),
                }
            }
            _ => fail("[SC] Invalid syntax."),
        }
    }

    fn schtasks(&self, args: &[&str]) -> ExecResult {
        let mut state = self.state.lock().expect("sim state");
        match args {
            ["/Query", "/TN", path, "/V", "/FO", "LIST"] => state.tasks.get(*path).map_or_else(
                || fail("ERROR: The system cannot find the file specified."),
                |enabled| {
                    let rendered = if *enabled { "Enabled" } else { "Disabled" };
                    ok(&format!(
                        "TaskName:      {path}\r\nScheduled Task State: {rendered}\r\n"
                    ))
                },
            ),
            ["/Change", "/TN", path, flag @ ("/DISABLE" | "/ENABLE")] => {
                match state.tasks.get_mut(*path) {
                    Some(enabled) => {
                        *enabled = *flag == "/ENABLE";
                        ok("SUCCESS: The parameters of scheduled task have been changed.")
                    }
                    None => fail("ERROR: The system cannot find the file specified."),
                }
            }
            _ => fail("ERROR: Invalid syntax."),
        }
    }

    fn winget(&self, args: &[&str]) -> ExecResult {
        let mut state = self.state.lock().expect("sim state");
        match args {
            ["list", "--id", id, ..] => {
                if state.packages.contains(*id) {
                    ok(&format!("Name  Id  Version\r\n----  --  -------\r\nPkg   {id}  1.0\r\n"))
                } else {
                    fail("No installed package found matching input criteria.")
                }
            }
            ["install", "--id", id, ..] => {
                if state.broken_packages.contains(*id) {
                    fail("Installer failed with exit code: 1603")
                } else {
                    state.packages.insert((*id).to_string());
                    ok("Successfully installed")
                }
            }
            _ => fail("Invalid winget invocation"),
        }
    }

    fn tasklist(&self, args: &[&str]) -> ExecResult {
        let state = self.state.lock().expect("sim state");
        match args {
            ["/FI", filter] => filter.strip_prefix("IMAGENAME eq ").map_or_else(
                || fail("ERROR: Invalid filter."),
                |image| {
                    if state.processes.contains(image) {
                        ok(&format!(
                            "Image Name    PID   Session Name\r\n{image}  4242  Console\r\n"
                        ))
                    } else {
                        ok("INFO: No tasks are running which match the specified criteria.")
                    }
                },
            ),
            _ => fail("ERROR: Invalid syntax."),
        }
    }

    fn taskkill(&self, args: &[&str]) -> ExecResult {
        let mut state = self.state.lock().expect("sim state");
        match args {
            ["/F", "/IM", image] => {
                if state.processes.remove(*image) {
                    ok(&format!("SUCCESS: The process \"{image}\" has been terminated."))
                } else {
                    fail(&format!("ERROR: The process \"{image}\" not found."))
                }
            }
            _ => fail("ERROR: Invalid syntax."),
        }
    }

    fn setx(&self, args: &[&str]) -> ExecResult {
        let (name, value, key) = match args {
            [name, value] => (name, value, r"HKCU\Environment"),
            [name, value, "/M"] => (
                name,
                value,
                r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Environment",
            ),
            _ => return fail("ERROR: Invalid syntax."),
        };
        self.set_registry_value(key, name, "REG_SZ", value);
        ok("SUCCESS: Specified value was saved.")
    }
}

/// `reg query` renders DWORDs as hex.
fn render_data(reg_type: &str, data: &str) -> String {
    if reg_type == "REG_DWORD" {
        data.parse::<u64>()
            .map_or_else(|_| data.to_string(), |n| format!("0x{n:x}"))
    } else {
        data.to_string()
    }
}

fn ok(stdout: &str) -> ExecResult {
    ExecResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        success: true,
        code: Some(0),
    }
}

fn fail(stdout: &str) -> ExecResult {
    ExecResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        success: false,
        code: Some(1),
    }
}

impl Executor for SimExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.dispatch(program, args);
        if result.success {
            Ok(result)
        } else {
            anyhow::bail!(
                "{program} failed (exit {}): {}",
                result.code.unwrap_or(-1),
                result.stdout.trim()
            )
        }
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.dispatch(program, args))
    }

    fn which(&self, program: &str) -> bool {
        program == "winget" && self.state.lock().expect("sim state").winget
    }
}

/// A simulated host seeded with everything the built-in catalog touches,
/// in its factory-default (pre-setup) state.
pub fn seeded_windows11() -> SimExecutor {
    SimExecutor::windows11()
        .with_service("DiagTrack", "AUTO_START", true)
        .with_service("dmwappushservice", "AUTO_START", false)
        .with_task(
            r"\Microsoft\Windows\Application Experience\Microsoft Compatibility Appraiser",
            true,
        )
        .with_task(
            r"\Microsoft\Windows\Customer Experience Improvement Program\Consolidator",
            true,
        )
        .with_registry_key(r"HKCR\Directory\shellex\ContextMenuHandlers\Sharing")
        .with_registry_key(r"HKCR\*\shellex\ContextMenuHandlers\ModernSharing")
        .with_process("explorer.exe")
}

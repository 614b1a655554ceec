//! Console: command buffer, command/alias/cvar dispatch
//!
//! Commands and cvars are declared statically with `inventory::submit!` and
//! collected into hash-sorted registries when the console is built. A command
//! line is dispatched by the hash of its first token, in priority order:
//! command, alias, cvar, then an "Unknown command" message.

mod builtins;
pub mod cmd;
pub mod cvar;
pub mod registry;

use std::collections::VecDeque;

use log::info;

pub use cmd::{parse_token, Args, BufferOverflow, CommandBuffer};
pub use cvar::{Cvar, CvarFlags, CvarRegistration, CvarRegistry};
pub use registry::{NameRegistry, RegistryEntry, RegistryError};

use crate::config::ConsoleConfig;
use crate::hash::name_hash;

const MAX_TRANSCRIPT_LINES: usize = 256;

pub type CommandFn = fn(&mut CommandContext<'_>);

/// Static command declaration, collected at start-up.
#[derive(Debug, Clone, Copy)]
pub struct CommandRegistration {
    pub name: &'static str,
    pub function: CommandFn,
}

impl CommandRegistration {
    pub const fn new(name: &'static str, function: CommandFn) -> Self {
        Self { name, function }
    }
}

inventory::collect!(CommandRegistration);

/// Where `exec` finds script files.
pub trait ScriptSource {
    fn load_script(&mut self, path: &str) -> Option<String>;
}

/// A source with no files at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScripts;

impl ScriptSource for NoScripts {
    fn load_script(&mut self, _path: &str) -> Option<String> {
        None
    }
}

/// What a command function sees while it runs.
pub struct CommandContext<'a> {
    pub console: &'a mut Console,
    pub args: &'a Args,
    pub scripts: &'a mut dyn ScriptSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub hash: u32,
    pub name: String,
    pub value: String,
}

pub struct Console {
    buffer: CommandBuffer,
    commands: NameRegistry<CommandFn>,
    aliases: Vec<Alias>,
    cvars: CvarRegistry,
    transcript: VecDeque<String>,
    launch_args: Vec<String>,
    max_args: usize,
}

impl Console {
    /// Build from every statically registered command and cvar.
    pub fn new(config: &ConsoleConfig) -> Result<Self, RegistryError> {
        Self::with_registrations(
            config,
            inventory::iter::<CommandRegistration>,
            inventory::iter::<CvarRegistration>,
        )
    }

    pub fn with_registrations<'a, 'b>(
        config: &ConsoleConfig,
        commands: impl IntoIterator<Item = &'a CommandRegistration>,
        cvars: impl IntoIterator<Item = &'b CvarRegistration>,
    ) -> Result<Self, RegistryError> {
        let mut registry = NameRegistry::new();
        for reg in commands {
            registry.register(reg.name, reg.function);
        }
        registry.init()?;
        let cvars = CvarRegistry::from_registrations(cvars)?;
        info!(
            "console: {} commands, {} cvars, {} byte buffer",
            registry.len(),
            cvars.len(),
            config.buffer_size
        );

        Ok(Self {
            buffer: CommandBuffer::new(config.buffer_size),
            commands: registry,
            aliases: Vec::new(),
            cvars,
            transcript: VecDeque::new(),
            launch_args: Vec::new(),
            max_args: config.max_args,
        })
    }

    /// Console output: logged and kept in the transcript.
    pub fn print(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        if self.transcript.len() == MAX_TRANSCRIPT_LINES {
            self.transcript.pop_front();
        }
        self.transcript.push_back(text);
    }

    pub fn transcript(&self) -> impl Iterator<Item = &str> {
        self.transcript.iter().map(String::as_str)
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    pub fn buffer(&self) -> &CommandBuffer {
        &self.buffer
    }

    pub fn add_text(&mut self, text: &str) -> Result<(), BufferOverflow> {
        self.buffer.add_text(text)
    }

    pub fn insert_text(&mut self, text: &str) -> Result<(), BufferOverflow> {
        self.buffer.insert_text(text)
    }

    /// Defer the rest of the buffer to the next `execute`.
    pub fn wait(&mut self) {
        self.buffer.set_wait();
    }

    pub fn commands(&self) -> &NameRegistry<CommandFn> {
        &self.commands
    }

    pub fn command_exists(&self, name: &str) -> bool {
        self.commands.find_name(name).is_some()
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn cvars(&self) -> &CvarRegistry {
        &self.cvars
    }

    pub fn cvars_mut(&mut self) -> &mut CvarRegistry {
        &mut self.cvars
    }

    /// Define or redefine an alias; new aliases are searched first.
    pub fn set_alias(&mut self, name: &str, value: String) {
        let hash = name_hash(name);
        match self.aliases.iter_mut().find(|alias| alias.hash == hash) {
            Some(alias) => alias.value = value,
            None => self.aliases.insert(
                0,
                Alias {
                    hash,
                    name: name.to_string(),
                    value,
                },
            ),
        }
    }

    pub fn find_alias(&self, hash: u32) -> Option<&Alias> {
        self.aliases.iter().find(|alias| alias.hash == hash)
    }

    /// Program arguments, read by `stuffcmds` and `check_parm`.
    pub fn set_launch_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launch_args = args.into_iter().map(Into::into).collect();
    }

    pub fn launch_args(&self) -> &[String] {
        &self.launch_args
    }

    /// Position of a launch argument (case-insensitive), skipping the program name.
    pub fn check_parm(&self, parm: &str) -> Option<usize> {
        self.launch_args
            .iter()
            .skip(1)
            .position(|arg| arg.eq_ignore_ascii_case(parm))
            .map(|i| i + 1)
    }

    /// Run buffered lines until the buffer is empty or a command waits.
    pub fn execute(&mut self, scripts: &mut dyn ScriptSource) {
        while let Some(line) = self.buffer.next_line() {
            self.execute_string(&line, scripts);
            if self.buffer.take_wait() {
                break;
            }
        }
    }

    /// Tokenize and dispatch a single command line.
    pub fn execute_string(&mut self, text: &str, scripts: &mut dyn ScriptSource) {
        let args = Args::tokenize(text, self.max_args);
        if args.argc() == 0 {
            return;
        }
        let hash = name_hash(args.argv(0));

        if let Some(&function) = self.commands.find(hash) {
            let mut ctx = CommandContext {
                console: self,
                args: &args,
                scripts,
            };
            function(&mut ctx);
            return;
        }

        if let Some(value) = self.find_alias(hash).map(|alias| alias.value.clone()) {
            // Overflow is reported by the buffer
            let _ = self.buffer.insert_text(&value);
            return;
        }

        if !self.cvar_command(hash, &args) {
            self.print(format!("Unknown command \"{}\"", args.argv(0)));
        }
    }

    /// Print or set a variable named by the first token.
    fn cvar_command(&mut self, hash: u32, args: &Args) -> bool {
        let Some(cvar) = self.cvars.find_mut(hash) else {
            return false;
        };
        if args.argc() == 1 {
            let line = format!("\"{}\" is \"{}\"", args.argv(0), cvar.string());
            self.print(line);
        } else {
            cvar.set(args.argv(1));
        }
        true
    }
}

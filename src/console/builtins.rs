//! Built-in console commands

use super::{CommandContext, CommandRegistration};

inventory::submit! { CommandRegistration::new("echo", echo) }
inventory::submit! { CommandRegistration::new("alias", alias) }
inventory::submit! { CommandRegistration::new("wait", wait) }
inventory::submit! { CommandRegistration::new("exec", exec) }
inventory::submit! { CommandRegistration::new("stuffcmds", stuffcmds) }
inventory::submit! { CommandRegistration::new("cvarlist", cvarlist) }

fn echo(ctx: &mut CommandContext<'_>) {
    let text = ctx.args.tokens()[1..].join(" ");
    ctx.console.print(text);
}

/// `alias` lists, `alias name commands...` defines.
fn alias(ctx: &mut CommandContext<'_>) {
    if ctx.args.argc() == 1 {
        ctx.console.print("Current alias commands:");
        let lines: Vec<String> = ctx
            .console
            .aliases()
            .iter()
            .map(|a| format!("{}: {}", a.name, a.value.trim_end()))
            .collect();
        for line in lines {
            ctx.console.print(line);
        }
        return;
    }

    let mut value = ctx.args.tokens()[2..].join(" ");
    value.push('\n');
    ctx.console.set_alias(ctx.args.argv(1), value);
}

/// Defer the rest of the buffer to the next frame.
fn wait(ctx: &mut CommandContext<'_>) {
    ctx.console.wait();
}

fn exec(ctx: &mut CommandContext<'_>) {
    if ctx.args.argc() != 2 {
        ctx.console.print("exec <filename> : execute a script file");
        return;
    }

    let path = ctx.args.argv(1);
    let Some(script) = ctx.scripts.load_script(path) else {
        ctx.console.print(format!("couldn't exec {}", path));
        return;
    };
    ctx.console.print(format!("execing {}", path));
    // Overflow is reported by the buffer
    let _ = ctx.console.insert_text(&script);
}

/// Run `+command args` launch parameters; a `-` argument ends a command.
fn stuffcmds(ctx: &mut CommandContext<'_>) {
    if ctx.args.argc() != 1 {
        ctx.console.print("stuffcmds : execute command line parameters");
        return;
    }

    let mut text = String::new();
    let mut in_command = false;
    for arg in ctx.console.launch_args().iter().skip(1) {
        if let Some(command) = arg.strip_prefix('+') {
            if in_command {
                text.push('\n');
            }
            text.push_str(command);
            in_command = true;
        } else if arg.starts_with('-') {
            if in_command {
                text.push('\n');
            }
            in_command = false;
        } else if in_command {
            text.push(' ');
            text.push_str(arg);
        }
    }
    if in_command {
        text.push('\n');
    }

    if !text.is_empty() {
        let _ = ctx.console.insert_text(&text);
    }
}

fn cvarlist(ctx: &mut CommandContext<'_>) {
    let mut lines: Vec<String> = ctx
        .console
        .cvars()
        .iter()
        .map(|cvar| {
            let flags = cvar.flags();
            format!(
                "{}{} {}",
                if flags.archive { '*' } else { ' ' },
                if flags.server { 's' } else { ' ' },
                cvar
            )
        })
        .collect();
    lines.sort_by(|a, b| a[3..].cmp(&b[3..]));
    let count = lines.len();
    for line in lines {
        ctx.console.print(line);
    }
    ctx.console.print(format!("{} cvars", count));
}

//! Entry point for the `stack` binary.

mod commands;
mod context;
mod error;

use stack_opts::Opts;

fn main() -> ! {
    stack_invoke::invoke_main::<Opts>(|ctx, opts| {
        error::report(commands::dispatch(&ctx.driver, opts.command))
    })
}

//! Show the current value of every known parameter.

use anyhow::Result;
use simtemp_harness::ParameterStore;
use simtemp_protocol::Parameter;

use super::Context;
use crate::output;

pub fn execute(ctx: &Context) -> Result<()> {
    let store = ctx.present_store()?;
    let rows: Vec<(Parameter, Option<String>)> = Parameter::ALL
        .into_iter()
        .map(|param| (param, store.get(param.name())))
        .collect();
    output::print_params(&store.describe(), &rows, ctx.json);
    Ok(())
}

mod include_list;
#[cfg(unix)]
mod resolver_flow;
mod views;

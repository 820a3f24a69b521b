mod pipeline;
mod plugin;

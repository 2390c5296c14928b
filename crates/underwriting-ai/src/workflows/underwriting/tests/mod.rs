mod common;

mod drivers;
mod routing;
mod scoring;
mod selection;

mod modules;
mod network;
mod params;
mod support;

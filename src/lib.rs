pub mod archive;
pub mod cli;
pub mod consts;
pub mod crds;
pub mod expansion;
pub mod gsutil_actions;
pub mod krm;
pub mod main_actions;
pub mod publish;
pub mod util;

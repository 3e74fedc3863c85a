//! Hand-written flows for authorities the generic recipe model cannot
//! express: multi-page wizards, anti-bot interstitials, evidence hidden
//! behind tabs. Control flow is deliberately hard-coded per portal.

pub mod meridian;
pub mod westbridge;

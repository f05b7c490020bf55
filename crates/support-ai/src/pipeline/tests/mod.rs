mod common;
mod decision;
mod recommend;
mod reconcile;

mod camera;
mod combat;
mod enemy;
mod kinematics;
mod level;
mod messages;
mod player;
mod save;
mod scene_impl;
mod session;
mod tile_grid;

pub(crate) use scene_impl::PlatformerScene;

#[cfg(test)]
mod tests;

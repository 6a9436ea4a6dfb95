//! The sandbox game: input handling, simulation and drawing.

use glam::{Vec2, Vec4};
use monkey_app::{AppContext, FrameContext, SpriteApp};
use monkey_entity::Transform2D;
use monkey_input::Bindings;
use monkey_render::{AmbientLight, Camera2D, PointLights, Sprite, SpriteRenderer, TextureCache};
use tracing::{error, info};

use crate::controls::{
    adjust_radius, default_bindings, hold_to_pause, light_anchor, scroll_zoom, step_max_fps, Action,
    ANIMATION_INTERVAL, MOVE_IMPULSE, RADIUS_SPEED,
};
use crate::scene::{Scene, SceneTextures};

/// Player walk cycles, as inclusive frame ranges.
const WALK_LEFT: (usize, usize) = (15, 8);
const WALK_RIGHT: (usize, usize) = (0, 7);
/// Angular velocity of the center block while Space is held.
const SPIN_SPEED: f32 = -1.0;

pub struct Game1 {
    scene: Scene,
    textures: TextureCache,
    renderer: SpriteRenderer,
    camera: Camera2D,
    lights: PointLights,
    ambient: AmbientLight,
    bindings: Bindings<Action>,
    /// Game time driving the wandering light.
    clock: f32,
    /// Time since the player's last animation frame.
    anim_time: f32,
}

impl SpriteApp for Game1 {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        let mut textures = TextureCache::new(&ctx.gpu, &ctx.commands)?;
        let scene_textures = SceneTextures::load(&mut textures, &ctx.gpu, &ctx.commands);

        let scene = Scene::build(&scene_textures, &mut rand::thread_rng())?;

        let mut lights = PointLights::new();
        scene.light_up(&mut lights)?;

        let mut camera = Camera2D::new(ctx.width(), ctx.height());
        camera.attach_to(scene.player);

        let renderer = SpriteRenderer::new(
            &ctx.gpu,
            &ctx.commands,
            &textures,
            ctx.swapchain.format,
            ctx.extent(),
            ctx.frames_in_flight(),
        )?;

        info!("{} textures loaded", textures.len());

        Ok(Self {
            scene,
            textures,
            renderer,
            camera,
            lights,
            ambient: AmbientLight::new(Vec4::ZERO),
            bindings: default_bindings(),
            clock: 0.0,
            anim_time: 0.0,
        })
    }

    fn handle_input(&mut self, ctx: &mut AppContext, raw_dt: f32) -> anyhow::Result<()> {
        self.apply_controls(ctx, raw_dt)
    }

    fn update(&mut self, _ctx: &mut AppContext, dt: f32) -> anyhow::Result<()> {
        self.clock += dt;
        if let Ok(mut anchor) = self.scene.world.get::<&mut Transform2D>(self.scene.light_anchor) {
            anchor.set_from_physics(light_anchor(self.clock), 0.0);
        }

        self.scene.physics.step(dt);
        self.scene.physics.sync_transforms(&mut self.scene.world);
        Ok(())
    }

    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()> {
        self.renderer.prepare(
            &ctx.gpu,
            frame.frame_index,
            &mut self.scene.world,
            &self.camera,
            &self.lights,
            &self.ambient,
        )?;
        self.renderer.record(
            &ctx.gpu,
            frame.command_buffer,
            frame.frame_index,
            frame.swapchain_image,
            frame.swapchain_image_view,
            &self.textures,
        )?;
        Ok(())
    }

    fn on_resize(&mut self, ctx: &mut AppContext, width: u32, height: u32) -> anyhow::Result<()> {
        self.renderer.resize(&ctx.gpu, ctx.extent())?;
        self.camera.set_viewport(width, height);
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut AppContext) {
        if let Err(e) = self.renderer.destroy(&ctx.gpu) {
            error!("Failed to destroy sprite renderer: {e}");
        }
        self.textures.destroy(&ctx.gpu);
    }
}

impl Game1 {
    /// Runs before the game clock is scaled, so `dt` is wall-clock time and a
    /// pause takes hold in the same frame.
    fn apply_controls(&mut self, ctx: &mut AppContext, dt: f32) -> anyhow::Result<()> {
        let bindings = &self.bindings;

        if ctx.input.released(bindings, Action::Exit) {
            ctx.request_exit();
            return Ok(());
        }

        if ctx.input.triggered(bindings, Action::FpsUp) {
            ctx.set_max_fps(step_max_fps(ctx.max_fps(), true));
        } else if ctx.input.triggered(bindings, Action::FpsDown) {
            ctx.set_max_fps(step_max_fps(ctx.max_fps(), false));
        }

        let pause_held = ctx.input.held(bindings, Action::Pause);
        hold_to_pause(ctx.clock_mut(), pause_held);

        let scroll = ctx.input.scroll_delta();
        if scroll.y != 0.0 {
            self.camera.add_zoom(scroll_zoom(scroll));
        }

        if ctx.input.held(bindings, Action::AmbientOn) {
            self.ambient.color = Vec4::ONE;
        }
        if ctx.input.held(bindings, Action::AmbientOff) {
            self.ambient.color.w = 0.0;
        }

        if let Some(light) = self.lights.get_mut(0) {
            if ctx.input.held(bindings, Action::LightGrow) {
                light.set_radius(adjust_radius(light.radius, RADIUS_SPEED * dt));
            }
            if ctx.input.held(bindings, Action::LightShrink) {
                light.set_radius(adjust_radius(light.radius, -RADIUS_SPEED * dt));
            }
        }

        let spin = if ctx.input.held(bindings, Action::Spin) {
            SPIN_SPEED
        } else {
            0.0
        };
        let block = self.scene.block;
        if (self.scene.physics.angular_velocity(block)? - spin).abs() > f32::EPSILON {
            self.scene.physics.set_angular_velocity(block, spin)?;
        }

        if ctx.is_paused() {
            return Ok(());
        }

        let mut impulse = Vec2::ZERO;
        let mut walk = None;
        if ctx.input.held(bindings, Action::MoveLeft) {
            impulse.x -= MOVE_IMPULSE * dt;
            walk = Some(WALK_LEFT);
        }
        if ctx.input.held(bindings, Action::MoveRight) {
            impulse.x += MOVE_IMPULSE * dt;
            walk = Some(WALK_RIGHT);
        }
        if ctx.input.held(bindings, Action::MoveUp) {
            impulse.y += MOVE_IMPULSE * dt;
        }
        if ctx.input.held(bindings, Action::MoveDown) {
            impulse.y -= MOVE_IMPULSE * dt;
        }

        if let Some((first, last)) = walk {
            self.animate_player(dt, first, last)?;
        }
        if impulse != Vec2::ZERO {
            self.scene.physics.apply_impulse(self.scene.player_body, impulse)?;
        }
        Ok(())
    }

    fn animate_player(&mut self, dt: f32, first: usize, last: usize) -> anyhow::Result<()> {
        self.anim_time += dt;
        if self.anim_time > ANIMATION_INTERVAL {
            self.anim_time = 0.0;
            self.scene
                .world
                .get::<&mut Sprite>(self.scene.player)?
                .advance_frame(first, last);
        }
        Ok(())
    }
}

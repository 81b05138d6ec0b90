use std::{mem::size_of, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use app::{
    CommandRecorder, SurfaceExtent, SwapchainGeneration, VkFrameDevice, VkSwapchainProvider,
};
use glam::{Mat4, Vec3};
use vulkan::{
    ash::vk, gpu_allocator::MemoryLocation, utils::create_gpu_only_buffer_from_data, VkBuffer,
    VkCommandBuffer, VkContext, VkDescriptorPool, VkDescriptorSet, VkDescriptorSetLayout,
    VkPipeline, VkPipelineLayout, VkRenderPass, VkWriteDescriptorSet, VkWriteDescriptorSetKind,
};

use crate::texture::{Texture, TEXTURE_PATH};

const VERTEX_SHADER_PATH: &str = concat!(env!("SHADER_OUT_DIR"), "/triangle.vert.spv");
const FRAGMENT_SHADER_PATH: &str = concat!(env!("SHADER_OUT_DIR"), "/triangle.frag.spv");

/// Quarter turn per second.
const ROTATION_SPEED: f32 = std::f32::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(size_of::<Vertex>() as _)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build()
    }

    fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription::builder()
                .binding(0)
                .location(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(0)
                .build(),
            vk::VertexInputAttributeDescription::builder()
                .binding(0)
                .location(1)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(size_of::<[f32; 2]>() as _)
                .build(),
            vk::VertexInputAttributeDescription::builder()
                .binding(0)
                .location(2)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(size_of::<[f32; 5]>() as _)
                .build(),
        ]
    }
}

#[rustfmt::skip]
pub const VERTICES: [Vertex; 4] = [
    Vertex { position: [-0.5, -0.5], color: [1.0, 0.0, 0.0], tex_coord: [1.0, 0.0] },
    Vertex { position: [0.5, -0.5], color: [0.0, 1.0, 0.0], tex_coord: [0.0, 0.0] },
    Vertex { position: [0.5, 0.5], color: [0.0, 0.0, 1.0], tex_coord: [0.0, 1.0] },
    Vertex { position: [-0.5, 0.5], color: [1.0, 1.0, 1.0], tex_coord: [1.0, 1.0] },
];

pub const INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Uniform payload of the vertex shader, one copy per frame in flight.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ModelViewProjection {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl ModelViewProjection {
    pub fn new(elapsed: Duration, aspect_ratio: f32) -> Self {
        let model = Mat4::from_rotation_z(elapsed.as_secs_f32() * ROTATION_SPEED);
        let view = Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Z);
        let mut projection =
            Mat4::perspective_rh(45f32.to_radians(), aspect_ratio, 0.1, 10.0);
        // Vulkan clip space has Y pointing down
        projection.y_axis.y *= -1.0;

        Self {
            model,
            view,
            projection,
        }
    }
}

/// Draws the spinning textured quad.
pub struct TriangleRecorder {
    descriptor_sets: Vec<VkDescriptorSet>,
    _descriptor_pool: VkDescriptorPool,
    uniform_buffers: Vec<VkBuffer>,
    _texture: Texture,
    index_buffer: VkBuffer,
    vertex_buffer: VkBuffer,
    pipeline: VkPipeline,
    pipeline_layout: VkPipelineLayout,
    _descriptor_set_layout: VkDescriptorSetLayout,
    render_pass: Arc<VkRenderPass>,
}

impl TriangleRecorder {
    pub fn new(
        context: &VkContext,
        render_pass: Arc<VkRenderPass>,
        frames_in_flight: usize,
    ) -> Result<Self> {
        log::info!("Creating triangle recorder");

        // Geometry
        let vertex_buffer = create_gpu_only_buffer_from_data(
            context,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &VERTICES,
        )?;
        let index_buffer =
            create_gpu_only_buffer_from_data(context, vk::BufferUsageFlags::INDEX_BUFFER, &INDICES)?;
        let texture = Texture::from_file(context, TEXTURE_PATH)?;

        // Descriptor and pipeline layouts
        let bindings = descriptor_bindings();
        let descriptor_set_layout = context.create_descriptor_set_layout(&bindings)?;
        let pipeline_layout = context.create_pipeline_layout(&[&descriptor_set_layout])?;

        // Pipeline
        let pipeline = create_pipeline(context, &render_pass, &pipeline_layout)?;

        // Uniform buffers and descriptor sets, one per frame in flight
        let uniform_buffers = (0..frames_in_flight)
            .map(|_| {
                context.create_buffer(
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryLocation::CpuToGpu,
                    size_of::<ModelViewProjection>() as _,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let set_count = frames_in_flight as u32;
        let descriptor_pool = context.create_descriptor_pool(&descriptor_set_layout, set_count)?;
        let descriptor_sets = descriptor_pool.allocate_sets(&descriptor_set_layout, set_count)?;

        descriptor_sets
            .iter()
            .zip(uniform_buffers.iter())
            .for_each(|(set, buffer)| {
                set.update(&[
                    VkWriteDescriptorSet {
                        binding: 0,
                        kind: VkWriteDescriptorSetKind::UniformBuffer { buffer },
                    },
                    VkWriteDescriptorSet {
                        binding: 1,
                        kind: VkWriteDescriptorSetKind::CombinedImageSampler {
                            view: &texture.view,
                            sampler: &texture.sampler,
                        },
                    },
                ])
            });

        Ok(Self {
            descriptor_sets,
            _descriptor_pool: descriptor_pool,
            uniform_buffers,
            _texture: texture,
            index_buffer,
            vertex_buffer,
            pipeline,
            pipeline_layout,
            _descriptor_set_layout: descriptor_set_layout,
            render_pass,
        })
    }
}

impl CommandRecorder<VkFrameDevice, VkSwapchainProvider> for TriangleRecorder {
    fn record(
        &mut self,
        command_buffer: &VkCommandBuffer,
        generation: &SwapchainGeneration,
        image_index: u32,
        frame_index: usize,
    ) -> Result<()> {
        let framebuffer = generation.framebuffer(image_index)?;
        let extent = generation.extent();
        let descriptor_set = self
            .descriptor_sets
            .get(frame_index)
            .ok_or_else(|| anyhow!("No descriptor set for frame {frame_index}"))?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        command_buffer.reset()?;
        command_buffer.begin(None)?;

        command_buffer.begin_render_pass(&self.render_pass, framebuffer, &clear_values);
        command_buffer.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, &self.pipeline);
        command_buffer.bind_vertex_buffer(&self.vertex_buffer);
        command_buffer.bind_index_buffer(&self.index_buffer, vk::IndexType::UINT16);
        command_buffer.set_viewport(extent.width, extent.height);
        command_buffer.set_scissor(extent.width, extent.height);
        command_buffer.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            &self.pipeline_layout,
            0,
            &[descriptor_set],
        );
        command_buffer.draw_indexed(INDICES.len() as _);
        command_buffer.end_render_pass();

        command_buffer.end()?;

        Ok(())
    }

    fn update_frame_state(
        &mut self,
        frame_index: usize,
        extent: SurfaceExtent,
        elapsed: Duration,
    ) -> Result<()> {
        let ubo = ModelViewProjection::new(elapsed, extent.aspect_ratio());

        self.uniform_buffers
            .get(frame_index)
            .ok_or_else(|| anyhow!("No uniform buffer for frame {frame_index}"))?
            .copy_data_to_buffer(std::slice::from_ref(&ubo))
    }
}

/// Transforms for the vertex stage, the texture for the fragment stage.
fn descriptor_bindings() -> [vk::DescriptorSetLayoutBinding; 2] {
    [
        vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX)
            .build(),
        vk::DescriptorSetLayoutBinding::builder()
            .binding(1)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build(),
    ]
}

fn create_pipeline(
    context: &VkContext,
    render_pass: &VkRenderPass,
    layout: &VkPipelineLayout,
) -> Result<VkPipeline> {
    log::debug!("Creating graphics pipeline");
    let vertex_shader = context
        .create_shader_module_from_file(VERTEX_SHADER_PATH)
        .context("Vertex shader missing, see shaders/README.md")?;
    let fragment_shader = context
        .create_shader_module_from_file(FRAGMENT_SHADER_PATH)
        .context("Fragment shader missing, see shaders/README.md")?;
    let shader_stages = [
        vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX),
        fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT),
    ];

    let binding_descriptions = [Vertex::binding_description()];
    let attribute_descriptions = Vertex::attribute_descriptions();
    let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
        .vertex_binding_descriptions(&binding_descriptions)
        .vertex_attribute_descriptions(&attribute_descriptions);

    let input_assembly_info = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    // Viewport and scissor are dynamic so the pipeline outlives swapchain rebuilds
    let viewport_info = vk::PipelineViewportStateCreateInfo::builder()
        .viewport_count(1)
        .scissor_count(1);
    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state_info =
        vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

    let rasterizer_info = vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false);

    let multisampling_info = vk::PipelineMultisampleStateCreateInfo::builder()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil_info = vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(
            vk::ColorComponentFlags::R
                | vk::ColorComponentFlags::G
                | vk::ColorComponentFlags::B
                | vk::ColorComponentFlags::A,
        )
        .blend_enable(false)
        .build()];
    let color_blending_info = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op_enable(false)
        .logic_op(vk::LogicOp::COPY)
        .attachments(&color_blend_attachments)
        .blend_constants([0.0, 0.0, 0.0, 0.0]);

    let mut pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_info)
        .input_assembly_state(&input_assembly_info)
        .viewport_state(&viewport_info)
        .rasterization_state(&rasterizer_info)
        .multisample_state(&multisampling_info)
        .depth_stencil_state(&depth_stencil_info)
        .color_blend_state(&color_blending_info)
        .dynamic_state(&dynamic_state_info)
        .render_pass(render_pass.inner)
        .subpass(0)
        .build();

    context.create_graphics_pipeline(layout, &mut pipeline_info)
}

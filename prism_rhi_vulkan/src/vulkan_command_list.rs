/// VulkanCommandList - Vulkan implementation of the CommandList trait

use std::sync::Arc;
use ash::vk;
use prism_rhi::prism::{Error, Result};
use prism_rhi::prism::rhi::{
    CommandList, CommandListState, ImageLayout, ObjectId, RhiHandle, SyncPrimitive,
};
use prism_rhi::engine_err;

use crate::vulkan_context::{VulkanContext, LOG_SOURCE};
use crate::vulkan_conversions::{from_rhi, image_layout_to_vk, layout_scope};

/// Vulkan command list
///
/// Wraps a primary command buffer owned by a queue's pool. Ring command lists
/// carry a binary "rendering complete" semaphore for present and a timeline
/// semaphore the CPU waits on before reusing the buffer; one-shot command
/// lists carry neither.
pub struct VulkanCommandList {
    context: Arc<VulkanContext>,
    name: String,
    command_buffer: vk::CommandBuffer,
    state: CommandListState,
    swapchain_id: Option<ObjectId>,
    rendering_complete: Option<Arc<SyncPrimitive>>,
    timeline: Option<Arc<SyncPrimitive>>,
}

impl VulkanCommandList {
    /// Wrap an allocated command buffer
    ///
    /// # Arguments
    ///
    /// * `context` - Shared Vulkan context
    /// * `name` - Debug name
    /// * `command_buffer` - Buffer allocated from the owning queue's pool
    /// * `rendering_complete` - Binary semaphore signaled on submit, if any
    /// * `timeline` - Timeline semaphore signaled on submit, if any
    pub(crate) fn new(
        context: Arc<VulkanContext>,
        name: &str,
        command_buffer: vk::CommandBuffer,
        rendering_complete: Option<Arc<SyncPrimitive>>,
        timeline: Option<Arc<SyncPrimitive>>,
    ) -> Self {
        context.set_object_name(
            vk::ObjectType::COMMAND_BUFFER,
            vk::Handle::as_raw(command_buffer),
            name,
        );

        Self {
            context,
            name: name.to_string(),
            command_buffer,
            state: CommandListState::Idle,
            swapchain_id: None,
            rendering_complete,
            timeline,
        }
    }

    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Timeline semaphore the owning queue signals on submit
    pub fn timeline_semaphore(&self) -> Option<Arc<SyncPrimitive>> {
        self.timeline.clone()
    }

    /// Start recording
    ///
    /// Clears the swapchain tag left by the previous frame.
    pub fn begin(&mut self) -> Result<()> {
        if self.state == CommandListState::Recording {
            return Err(Error::ContractViolation(format!(
                "Command list '{}' is already recording",
                self.name
            )));
        }

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.context
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| {
                    engine_err!(BackendError, LOG_SOURCE, "Failed to begin command list '{}': {:?}", self.name, e)
                })?;
        }

        self.swapchain_id = None;
        self.state = CommandListState::Recording;
        Ok(())
    }

    /// Stop recording
    pub fn end(&mut self) -> Result<()> {
        if self.state != CommandListState::Recording {
            return Err(Error::ContractViolation(format!(
                "Command list '{}' is not recording",
                self.name
            )));
        }

        unsafe {
            self.context
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| {
                    engine_err!(BackendError, LOG_SOURCE, "Failed to end command list '{}': {:?}", self.name, e)
                })?;
        }

        self.state = CommandListState::Idle;
        Ok(())
    }

    pub(crate) fn set_state(&mut self, state: CommandListState) {
        self.state = state;
    }
}

impl CommandList for VulkanCommandList {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> CommandListState {
        self.state
    }

    fn insert_barrier_texture(
        &mut self,
        image: RhiHandle,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<()> {
        if self.state != CommandListState::Recording {
            return Err(Error::ContractViolation(format!(
                "Barrier recorded into '{}' while it is not recording",
                self.name
            )));
        }

        let (src_stage, src_access) = layout_scope(old_layout);
        let (dst_stage, dst_access) = layout_scope(new_layout);

        let barriers = [vk::ImageMemoryBarrier2::default()
            .src_stage_mask(src_stage)
            .src_access_mask(src_access)
            .dst_stage_mask(dst_stage)
            .dst_access_mask(dst_access)
            .old_layout(image_layout_to_vk(old_layout))
            .new_layout(image_layout_to_vk(new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(from_rhi(image))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })];

        let dependency_info = vk::DependencyInfo::default().image_memory_barriers(&barriers);

        unsafe {
            self.context
                .device
                .cmd_pipeline_barrier2(self.command_buffer, &dependency_info);
        }

        Ok(())
    }

    fn swapchain_id(&self) -> Option<ObjectId> {
        self.swapchain_id
    }

    fn set_swapchain_id(&mut self, id: ObjectId) {
        self.swapchain_id = Some(id);
    }

    fn rendering_complete_semaphore(&self) -> Option<Arc<SyncPrimitive>> {
        self.rendering_complete.clone()
    }
}

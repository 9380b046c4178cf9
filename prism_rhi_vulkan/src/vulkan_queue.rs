/// VulkanQueue - Vulkan implementation of the Queue trait
///
/// Each queue owns a small ring of command lists allocated from a transient
/// pool. A frame records into the current list, `submit` signals the list's
/// rendering-complete and timeline semaphores, and the swapchain later makes
/// the present wait on the rendering-complete one. `begin_frame` moves to the
/// next list, waiting on its timeline if the GPU has not finished it yet.
///
/// Submit, present and wait-idle are serialised by a mutex shared by every
/// queue object that maps to the same `vk::Queue`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use ash::vk;
use prism_rhi::prism::{Error, Result};
use prism_rhi::prism::rhi::{
    CommandList, CommandListState, QueueType, Queue, RhiHandle, SyncPrimitive, SyncPrimitiveType,
};
use prism_rhi::{engine_debug, engine_err};

use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_context::{VulkanContext, LOG_SOURCE};
use crate::vulkan_conversions::from_rhi;

/// Command lists in flight per queue
pub const COMMAND_LIST_RING_SIZE: usize = 2;

fn queue_name(queue_type: QueueType) -> &'static str {
    match queue_type {
        QueueType::Graphics => "graphics_queue",
        QueueType::Compute => "compute_queue",
        QueueType::Copy => "copy_queue",
    }
}

/// Vulkan queue
pub struct VulkanQueue {
    context: Arc<VulkanContext>,
    queue_type: QueueType,
    family_index: u32,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    /// Pool for one-shot submissions, guarded separately from the ring
    immediate_pool: Mutex<vk::CommandPool>,
    command_lists: Vec<Arc<Mutex<VulkanCommandList>>>,
    current: AtomicUsize,
    /// Last value signaled on any ring timeline
    timeline_counter: AtomicU64,
    /// Serialises submit / present / wait, shared by queues on the same family
    submit_lock: Arc<Mutex<()>>,
}

impl VulkanQueue {
    /// Create a queue with its pools and command list ring
    ///
    /// # Arguments
    ///
    /// * `context` - Shared Vulkan context
    /// * `queue_type` - Graphics, compute or copy
    /// * `family_index` - Queue family the queue belongs to
    /// * `submit_lock` - Lock shared by every queue object using the same `vk::Queue`
    pub(crate) fn new(
        context: Arc<VulkanContext>,
        queue_type: QueueType,
        family_index: u32,
        submit_lock: Arc<Mutex<()>>,
    ) -> Result<Self> {
        let name = queue_name(queue_type);

        unsafe {
            let queue = context.device.get_device_queue(family_index, 0);
            context.set_object_name(vk::ObjectType::QUEUE, vk::Handle::as_raw(queue), name);

            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(family_index)
                .flags(
                    vk::CommandPoolCreateFlags::TRANSIENT
                        | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                );

            let command_pool = context.device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_err!(InitializationFailed, LOG_SOURCE, "Failed to create command pool for {}: {:?}", name, e)
            })?;
            context.set_object_name(vk::ObjectType::COMMAND_POOL, vk::Handle::as_raw(command_pool), name);

            let immediate_pool = match context.device.create_command_pool(&pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    context.device.destroy_command_pool(command_pool, None);
                    return Err(engine_err!(InitializationFailed, LOG_SOURCE, "Failed to create immediate command pool for {}: {:?}", name, e));
                }
            };

            // From here on Drop releases both pools
            let mut queue = Self {
                context,
                queue_type,
                family_index,
                queue,
                command_pool,
                immediate_pool: Mutex::new(immediate_pool),
                command_lists: Vec::with_capacity(COMMAND_LIST_RING_SIZE),
                current: AtomicUsize::new(0),
                timeline_counter: AtomicU64::new(0),
                submit_lock,
            };

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(queue.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(COMMAND_LIST_RING_SIZE as u32);

            let buffers = queue.context.device.allocate_command_buffers(&alloc_info).map_err(|e| {
                engine_err!(InitializationFailed, LOG_SOURCE, "Failed to allocate command lists for {}: {:?}", name, e)
            })?;

            for (i, buffer) in buffers.into_iter().enumerate() {
                let backend = queue.context.clone();
                let rendering_complete = SyncPrimitive::new(
                    backend.clone(),
                    SyncPrimitiveType::Semaphore,
                    &format!("{}_rendering_complete_{}", name, i),
                )?;
                let timeline = SyncPrimitive::new(
                    backend,
                    SyncPrimitiveType::SemaphoreTimeline,
                    &format!("{}_timeline_{}", name, i),
                )?;

                queue.command_lists.push(Arc::new(Mutex::new(VulkanCommandList::new(
                    queue.context.clone(),
                    &format!("cmd_list_{}", i),
                    buffer,
                    Some(Arc::new(rendering_complete)),
                    Some(Arc::new(timeline)),
                ))));
            }

            Ok(queue)
        }
    }

    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    pub fn vk_queue(&self) -> vk::Queue {
        self.queue
    }

    fn lock_submit(&self) -> MutexGuard<'_, ()> {
        self.submit_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_list(&self) -> &Arc<Mutex<VulkanCommandList>> {
        &self.command_lists[self.current.load(Ordering::Acquire) % self.command_lists.len()]
    }

    /// Move to the next command list of the ring and start recording into it
    ///
    /// Blocks until the GPU has finished the previous use of that list.
    pub fn begin_frame(&self) -> Result<Arc<Mutex<VulkanCommandList>>> {
        let next = (self.current.load(Ordering::Acquire) + 1) % self.command_lists.len();
        let list = self.command_lists[next].clone();

        {
            let mut cmd = list.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            if cmd.state() == CommandListState::Submitted {
                if let Some(timeline) = cmd.timeline_semaphore() {
                    timeline.wait(Duration::MAX)?;
                }
                cmd.set_state(CommandListState::Idle);
            }

            cmd.begin()?;
        }

        self.current.store(next, Ordering::Release);
        Ok(list)
    }

    /// End and submit the current command list
    ///
    /// Signals its rendering-complete semaphore (for present) and its timeline
    /// semaphore with the next queue-wide value. The ring does not advance.
    pub fn submit(&self) -> Result<()> {
        let list = self.current_list().clone();
        let mut cmd = list.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if cmd.state() == CommandListState::Recording {
            cmd.end()?;
        }
        if cmd.state() == CommandListState::Submitted {
            return Err(Error::ContractViolation(format!(
                "Command list '{}' was already submitted",
                cmd.name()
            )));
        }

        let rendering_complete = cmd.rendering_complete_semaphore();
        let timeline = cmd.timeline_semaphore();

        let _guard = self.lock_submit();
        let value = self.timeline_counter.fetch_add(1, Ordering::AcqRel) + 1;

        let mut signals = Vec::with_capacity(2);
        if let Some(semaphore) = &rendering_complete {
            signals.push(
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(from_rhi(semaphore.rhi_resource()))
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
            );
        }
        if let Some(semaphore) = &timeline {
            signals.push(
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(from_rhi(semaphore.rhi_resource()))
                    .value(value)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
            );
        }

        let command_buffers = [vk::CommandBufferSubmitInfo::default().command_buffer(cmd.command_buffer())];
        let submit_info = vk::SubmitInfo2::default()
            .command_buffer_infos(&command_buffers)
            .signal_semaphore_infos(&signals);

        unsafe {
            self.context
                .device
                .queue_submit2(self.queue, &[submit_info], vk::Fence::null())
                .map_err(|e| {
                    engine_err!(BackendError, LOG_SOURCE, "Failed to submit '{}' to {}: {:?}", cmd.name(), queue_name(self.queue_type), e)
                })?;
        }

        if let Some(semaphore) = &rendering_complete {
            semaphore.set_waited_for(false);
        }
        if let Some(semaphore) = &timeline {
            semaphore.set_wait_value(value);
        }
        cmd.set_state(CommandListState::Submitted);

        Ok(())
    }

    /// Record into a one-shot command list, submit it and wait for completion
    pub(crate) fn immediate_submit(
        &self,
        record: &mut dyn FnMut(&mut dyn CommandList) -> Result<()>,
    ) -> Result<()> {
        let pool = self.immediate_pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let device = &self.context.device;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe {
            device.allocate_command_buffers(&alloc_info).map_err(|e| {
                engine_err!(BackendError, LOG_SOURCE, "Failed to allocate one-shot command buffer: {:?}", e)
            })?[0]
        };

        let result = self.record_and_wait(command_buffer, record);

        unsafe {
            device.free_command_buffers(*pool, &[command_buffer]);
        }

        result
    }

    fn record_and_wait(
        &self,
        command_buffer: vk::CommandBuffer,
        record: &mut dyn FnMut(&mut dyn CommandList) -> Result<()>,
    ) -> Result<()> {
        let mut cmd = VulkanCommandList::new(self.context.clone(), "immediate", command_buffer, None, None);
        cmd.begin()?;
        record(&mut cmd)?;
        cmd.end()?;

        let fence = SyncPrimitive::new(self.context.clone(), SyncPrimitiveType::Fence, "immediate_fence")?;

        let command_buffers = [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer)];
        let submit_info = vk::SubmitInfo2::default().command_buffer_infos(&command_buffers);

        {
            let _guard = self.lock_submit();
            unsafe {
                self.context
                    .device
                    .queue_submit2(self.queue, &[submit_info], from_rhi(fence.rhi_resource()))
                    .map_err(|e| {
                        engine_err!(BackendError, LOG_SOURCE, "Failed to submit one-shot commands: {:?}", e)
                    })?;
            }
        }

        fence.wait(Duration::MAX)?;
        Ok(())
    }
}

impl Queue for VulkanQueue {
    fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    fn command_list(&self) -> Arc<Mutex<dyn CommandList>> {
        self.current_list().clone()
    }

    fn present(
        &self,
        swapchain: RhiHandle,
        image_index: u32,
        wait_semaphores: &[Arc<SyncPrimitive>],
    ) -> Result<()> {
        let waits: Vec<vk::Semaphore> = wait_semaphores
            .iter()
            .map(|s| from_rhi(s.rhi_resource()))
            .collect();
        let swapchains = [from_rhi::<vk::SwapchainKHR>(swapchain)];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&waits)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _guard = self.lock_submit();
        let result = unsafe {
            self.context
                .swapchain_loader
                .queue_present(self.queue, &present_info)
        };

        match result {
            Ok(false) => Ok(()),
            Ok(true) => {
                engine_debug!(LOG_SOURCE, "Presented image {} on a suboptimal swapchain", image_index);
                Ok(())
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(engine_err!(SurfaceLost, LOG_SOURCE, "Swapchain {} is out of date", swapchain)),
            Err(vk::Result::ERROR_SURFACE_LOST_KHR) => Err(engine_err!(SurfaceLost, LOG_SOURCE, "Surface of swapchain {} was lost", swapchain)),
            Err(e) => Err(engine_err!(BackendError, LOG_SOURCE, "Failed to present image {}: {:?}", image_index, e)),
        }
    }

    fn wait(&self) -> Result<()> {
        let _guard = self.lock_submit();
        unsafe {
            self.context.device.queue_wait_idle(self.queue).map_err(|e| {
                engine_err!(BackendError, LOG_SOURCE, "Failed to wait for {}: {:?}", queue_name(self.queue_type), e)
            })
        }
    }
}

impl Drop for VulkanQueue {
    fn drop(&mut self) {
        unsafe {
            {
                let _guard = self.lock_submit();
                self.context.device.queue_wait_idle(self.queue).ok();
            }

            // Semaphores are released with the command lists; buffers go with the pool
            self.command_lists.clear();
            self.context.device.destroy_command_pool(self.command_pool, None);

            let pool = self.immediate_pool.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.context.device.destroy_command_pool(*pool, None);
        }
    }
}

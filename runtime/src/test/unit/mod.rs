mod allocator;
mod compiler;
mod device;

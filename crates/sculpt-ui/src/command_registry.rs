//! 命令注册表
//!
//! 把宿主连接的槽名（如 `enableTool`）、短命令和用户别名映射到 [`ExtruderCommand`]。
//! 查找不区分大小写。

use crate::actions::shape_extruder::ExtruderCommand;
use std::collections::HashMap;

/// 命令注册表
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    /// 完整命令 -> ExtruderCommand
    main_commands: HashMap<String, ExtruderCommand>,
    /// 短命令 -> ExtruderCommand
    short_commands: HashMap<String, ExtruderCommand>,
    /// 用户别名 -> 完整命令
    aliases: HashMap<String, String>,
    /// ExtruderCommand -> 完整命令（反向查找）
    command_to_name: HashMap<ExtruderCommand, String>,
}

impl CommandRegistry {
    /// 创建新的命令注册表
    pub fn new() -> Self {
        let mut registry = Self {
            main_commands: HashMap::new(),
            short_commands: HashMap::new(),
            aliases: HashMap::new(),
            command_to_name: HashMap::new(),
        };

        registry.register_defaults();

        registry
    }

    fn register_defaults(&mut self) {
        self.register(ExtruderCommand::EnableTool, "enableTool", &["enable"]);
        self.register(ExtruderCommand::DisableTool, "disableTool", &["disable"]);
        self.register(ExtruderCommand::Validate, "validate", &["v"]);
        self.register(ExtruderCommand::CancelLastClick, "cancelLastClick", &["undo"]);
        self.register(ExtruderCommand::DeleteLastMesh, "deleteLastMesh", &["delete"]);
        self.register(ExtruderCommand::Reset, "reset", &[]);
    }

    /// 注册命令
    ///
    /// # 参数
    /// - `command`: ExtruderCommand
    /// - `full_cmd`: 槽名（如 "enableTool"）
    /// - `shortcuts`: 短命令列表（如 ["enable"]）
    pub fn register(&mut self, command: ExtruderCommand, full_cmd: &str, shortcuts: &[&str]) {
        let full_cmd_upper = full_cmd.to_uppercase();

        self.main_commands.insert(full_cmd_upper, command);
        self.command_to_name.insert(command, full_cmd.to_string());

        for shortcut in shortcuts {
            self.short_commands.insert(shortcut.to_uppercase(), command);
        }
    }

    /// 查找命令
    pub fn lookup(&self, input: &str) -> Option<ExtruderCommand> {
        let input_upper = input.trim().to_uppercase();

        // 1. 完整命令
        if let Some(&command) = self.main_commands.get(&input_upper) {
            return Some(command);
        }

        // 2. 短命令
        if let Some(&command) = self.short_commands.get(&input_upper) {
            return Some(command);
        }

        // 3. 别名
        if let Some(cmd) = self.aliases.get(&input_upper) {
            return self.main_commands.get(cmd).copied();
        }

        None
    }

    /// 获取命令的槽名
    pub fn get_command_name(&self, command: ExtruderCommand) -> Option<&str> {
        self.command_to_name.get(&command).map(|s| s.as_str())
    }

    /// 添加用户别名
    pub fn add_alias(&mut self, alias: &str, command: &str) {
        let alias_upper = alias.to_uppercase();
        let command_upper = command.to_uppercase();

        // 不允许覆盖现有命令
        if self.main_commands.contains_key(&alias_upper) {
            return;
        }

        if self.main_commands.contains_key(&command_upper) {
            self.aliases.insert(alias_upper, command_upper);
        }
    }

    /// 移除别名
    pub fn remove_alias(&mut self, alias: &str) {
        self.aliases.remove(&alias.to_uppercase());
    }

    /// 所有槽名（排序后）
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.command_to_name.values().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

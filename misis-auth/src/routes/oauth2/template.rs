//! Built-in pages. Can be replaced by files with the `templates` configuration.

pub const LOGIN: &'static str = "\
<!DOCTYPE html>\
<html lang=\"ru\">\
<head>\
<meta charset=\"utf-8\">\
<meta http-equiv=\"X-UA-Compatible\" content=\"IE=edge\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>Вход через МИСИС</title>\
<style>\
    body {\
        font-family: -apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, sans-serif;\
        background: #f4f6fa;\
    }\
    .login-form {\
        width: 360px;\
        margin: 60px auto;\
    }\
    .login-form form {\
        background: #ffffff;\
        box-shadow: 0px 2px 6px rgba(0, 0, 0, 0.15);\
        border-radius: 6px;\
        padding: 30px;\
    }\
    .login-form h2 {\
        margin: 0 0 8px;\
    }\
    .login-form p.client {\
        color: #555555;\
        margin: 0 0 20px;\
    }\
    .login-form input[type=text], .login-form input[type=password] {\
        box-sizing: border-box;\
        width: 100%;\
        min-height: 38px;\
        margin-bottom: 12px;\
        padding: 6px 10px;\
    }\
    .login-form .error {\
        color: #c0392b;\
        margin-bottom: 12px;\
    }\
    .login-form .buttons {\
        display: flex;\
        gap: 10px;\
    }\
    .login-form button {\
        flex: 1;\
        min-height: 38px;\
        font-weight: bold;\
    }\
</style>\
</head>\
<body>\
<div class=\"login-form\">\
    <form action=\"{{scope_path}}/oauth/login\" method=\"post\">\
        <h2>Вход через МИСИС</h2>\
        <p class=\"client\">Приложение <b>{{client_name}}</b> запрашивает доступ: {{scope}}</p>\
        {% if error %}<div class=\"error\">{{error}}</div>{% endif %}\
        <input type=\"hidden\" name=\"state\" value=\"{{state}}\">\
        <input type=\"text\" name=\"login\" placeholder=\"Логин lk.misis.ru\" autofocus>\
        <input type=\"password\" name=\"password\" placeholder=\"Пароль\">\
        <div class=\"buttons\">\
            <button type=\"submit\">Войти</button>\
            <button type=\"submit\" name=\"cancel\" value=\"yes\">Отмена</button>\
        </div>\
    </form>\
</div>\
</body>\
</html>";
